//! End-to-end engine scenarios against the headless host

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use scrollwork_animation::AnimationBinding;
use scrollwork_core::{Bounds, ElementId, PinPlacement, Property, Size};
use scrollwork_engine::{
    DotState, EngineConfig, HeadlessHost, LifecycleState, PinSpec, Position, Presentation,
    RegionEvent, ScrollBehavior, ScrollEngine, TimelineDots, TriggerId, TriggerPoint, TriggerSpec,
};

const FRAME_MS: f64 = 16.0;

struct Page {
    engine: ScrollEngine<HeadlessHost>,
    now: f64,
}

impl Page {
    fn new(config: EngineConfig, viewport: Size, document: Size) -> Self {
        let host = HeadlessHost::new(viewport, document);
        Self {
            engine: ScrollEngine::new(config, host).unwrap(),
            now: 0.0,
        }
    }

    fn insert(&mut self, bounds: Bounds) -> ElementId {
        self.engine.host_mut().insert(bounds)
    }

    fn frame(&mut self) -> scrollwork_engine::FrameReport {
        let report = self.engine.frame(self.now).unwrap();
        self.now += FRAME_MS;
        report
    }

    fn scroll(&mut self, offset: f32) -> scrollwork_engine::FrameReport {
        self.engine.on_native_scroll(offset);
        self.frame()
    }

    fn progress(&self, id: TriggerId) -> f32 {
        self.engine.progress(id).unwrap()
    }
}

/// Horizontal rail: viewport 1000 wide, rail content 2600 wide
fn rail_page() -> (Page, TriggerId, ElementId, ElementId) {
    let mut page = Page::new(
        EngineConfig::unsmoothed(),
        Size::new(1000.0, 800.0),
        Size::new(1000.0, 3000.0),
    );
    let section = page.insert(Bounds::new(0.0, 800.0, 1000.0, 800.0));
    let rail = page.insert(Bounds::new(0.0, 800.0, 2600.0, 800.0));
    page.engine
        .host_mut()
        .set_content_extent(rail, Size::new(2600.0, 800.0));

    let view = page.engine.route_did_mount("work");
    let pin = page
        .engine
        .register(
            view,
            TriggerSpec::pin(section, PinSpec::horizontal(rail)).label("rail"),
        )
        .unwrap();
    (page, pin, section, rail)
}

#[test]
fn test_pinned_rail_reserves_overflow_and_translates() {
    let (mut page, pin, section, rail) = rail_page();

    let span = page.engine.registry().span(pin).unwrap();
    assert_eq!(span.start, 800.0);
    assert_eq!(span.end, 2400.0);
    assert_eq!(page.engine.host().spacing(section), 1600.0);
    assert_eq!(page.engine.scroll_limit(), 3000.0 + 1600.0 - 800.0);

    page.scroll(400.0);
    assert_eq!(page.engine.placement(pin), Some(PinPlacement::Flow));

    page.scroll(1600.0);
    assert_eq!(page.progress(pin), 0.5);
    assert_eq!(page.engine.host().visual(rail).translate_x, -800.0);
    assert_eq!(
        page.engine.host().placement(section),
        PinPlacement::Pinned {
            viewport_offset: 0.0
        }
    );

    page.scroll(2400.0);
    assert_eq!(page.progress(pin), 1.0);
    assert_eq!(page.engine.host().visual(rail).translate_x, -1600.0);

    page.scroll(2500.0);
    assert_eq!(
        page.engine.host().placement(section),
        PinPlacement::Released { shift: 1600.0 }
    );

    // Scrolling back reproduces the same state for the same offset
    page.scroll(1600.0);
    assert_eq!(page.progress(pin), 0.5);
    assert_eq!(page.engine.host().visual(rail).translate_x, -800.0);
    assert!(page.engine.host().placement(section).is_pinned());

    page.scroll(0.0);
    assert_eq!(page.engine.host().placement(section), PinPlacement::Flow);
}

#[test]
fn test_regions_after_pin_are_pushed_down() {
    let (mut page, _pin, _section, _rail) = rail_page();
    let view = page.engine.current_route().unwrap();
    let footer = page.insert(Bounds::new(0.0, 1600.0, 1000.0, 400.0));
    let id = page.engine.register(view, TriggerSpec::scrub(footer)).unwrap();

    // natural top 1600 + 1600 spacing, entering at the viewport bottom
    assert_eq!(page.engine.registry().span(id).unwrap().start, 2400.0);
    page.scroll(3000.0);
    assert_eq!(page.progress(id), 0.5);
}

#[test]
fn test_nested_cards_follow_rail_in_same_frame() {
    let (mut page, pin, _section, _rail) = rail_page();
    let view = page.engine.current_route().unwrap();
    let card = page.insert(Bounds::new(1200.0, 800.0, 400.0, 800.0));
    let nested = page
        .engine
        .register(view, TriggerSpec::scrub(card).container(pin))
        .unwrap();

    page.scroll(800.0);
    assert_eq!(page.progress(nested), 0.0);
    assert_eq!(page.engine.position(nested), Some(Position::Before));

    let report = page.scroll(1600.0);
    // Rail at 800px of travel; card enters at 200 and leaves at 1600
    let expected = (800.0 - 200.0) / 1400.0;
    assert!((page.progress(nested) - expected).abs() < 1e-5);

    let order: Vec<TriggerId> = report.updates.iter().map(|u| u.id).collect();
    assert_eq!(order, vec![pin, nested]);

    // Removing the container removes the nested region with it
    assert!(page.engine.unregister(pin));
    assert_eq!(page.engine.progress(nested), None);
    assert_eq!(page.engine.scroll_limit(), 3000.0 - 800.0);
}

#[test]
fn test_reserved_length_recomputed_mid_pin() {
    let (mut page, pin, section, rail) = rail_page();
    page.scroll(1600.0);
    assert_eq!(page.progress(pin), 0.5);

    // Rail content grows while pinned (late images)
    page.engine
        .host_mut()
        .set_content_extent(rail, Size::new(3400.0, 800.0));
    page.engine.invalidate_layout("rail images loaded");
    page.engine.refresh_all().unwrap();

    assert_eq!(page.engine.host().spacing(section), 2400.0);
    assert_eq!(page.engine.scroll_limit(), 3000.0 + 2400.0 - 800.0);
    assert_eq!(page.engine.registry().span(pin).unwrap().end, 3200.0);
    // Stored state is untouched until the next frame
    assert_eq!(page.progress(pin), 0.5);
    assert_eq!(page.engine.scroll_state().smoothed_offset, 1600.0);

    page.frame();
    let expected = 800.0 / 2400.0;
    assert!((page.progress(pin) - expected).abs() < 1e-5);
    assert!(page.engine.host().placement(section).is_pinned());
    let translate = page.engine.host().visual(rail).translate_x;
    assert!((translate + expected * 2400.0).abs() < 1e-2);
}

#[test]
fn test_binding_on_rail_keeps_pin_translation() {
    let (mut page, pin, _section, rail) = rail_page();
    page.engine
        .bind(
            pin,
            rail,
            AnimationBinding::linear().from_to(Property::Opacity, 0.0, 1.0),
        )
        .unwrap();

    page.scroll(1600.0);
    let visual = page.engine.host().visual(rail);
    assert_eq!(visual.opacity, 0.5);
    assert_eq!(visual.translate_x, -800.0);

    page.scroll(2400.0);
    let visual = page.engine.host().visual(rail);
    assert_eq!(visual.opacity, 1.0);
    assert_eq!(visual.translate_x, -1600.0);
}

#[test]
fn test_faulted_pin_releases_spacing() {
    let mut page = Page::new(
        EngineConfig::unsmoothed(),
        Size::new(1000.0, 800.0),
        Size::new(1000.0, 3000.0),
    );
    let section = page.insert(Bounds::new(0.0, 800.0, 1000.0, 800.0));
    let rail = page.insert(Bounds::new(0.0, 800.0, 2600.0, 800.0));
    page.engine
        .host_mut()
        .set_content_extent(rail, Size::new(2600.0, 800.0));
    let footer = page.insert(Bounds::new(0.0, 1600.0, 1000.0, 400.0));

    let view = page.engine.route_did_mount("work");
    let pin = page
        .engine
        .register(
            view,
            TriggerSpec::pin(section, PinSpec::horizontal(rail))
                .on_update(|_| panic!("rail listener failed")),
        )
        .unwrap();
    let after = page
        .engine
        .register(view, TriggerSpec::scrub(footer))
        .unwrap();
    assert_eq!(page.engine.registry().span(after).unwrap().start, 2400.0);

    let report = page.scroll(1600.0);
    assert_eq!(report.faulted, vec![pin]);
    assert!(!page.engine.registry().is_active(pin));

    let check = |page: &Page| {
        let host = page.engine.host();
        assert_eq!(host.spacing(section), 0.0);
        assert_eq!(host.placement(section), PinPlacement::Flow);
        assert_eq!(host.visual(rail).translate_x, 0.0);
        // Footer back at its natural position, matching the host
        assert_eq!(page.engine.registry().span(after).unwrap().start, 800.0);
        assert_eq!(page.engine.scroll_limit(), 3000.0 - 800.0);
    };
    check(&page);

    page.engine.refresh_all().unwrap();
    check(&page);

    page.frame();
    assert!(page.progress(after) > 0.0);
}

#[test]
fn test_timeline_dots_from_pin_progress() {
    let (mut page, pin, _section, _rail) = rail_page();
    let dots = TimelineDots::new(4);
    let presentation = Presentation::new(move |p| dots.derive(p));
    let handle = presentation.handle();
    page.engine.subscribe(pin, presentation).unwrap();

    page.scroll(1700.0);
    let state = handle.lock().unwrap().clone();
    assert_eq!(
        state,
        vec![
            DotState::Passed,
            DotState::Passed,
            DotState::Current,
            DotState::Upcoming
        ]
    );
}

#[test]
fn test_one_shot_toggle_enters_once() {
    let mut page = Page::new(
        EngineConfig::unsmoothed(),
        Size::new(1000.0, 800.0),
        Size::new(1000.0, 4000.0),
    );
    let el = page.insert(Bounds::new(0.0, 1200.0, 1000.0, 400.0));
    let view = page.engine.open_view("page");

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let id = page
        .engine
        .register(
            view,
            TriggerSpec::toggle(el, false)
                .start("top 80%".parse().unwrap())
                .on_toggle(move |event| sink.lock().unwrap().push(event)),
        )
        .unwrap();
    page.engine
        .bind(id, el, AnimationBinding::fade_up(40.0))
        .unwrap();
    assert_eq!(page.engine.host().visual(el).opacity, 0.0);

    for offset in [0.0, 700.0, 0.0, 700.0, 3000.0, 700.0, 0.0] {
        page.scroll(offset);
        for _ in 0..60 {
            page.frame();
        }
    }

    assert_eq!(*events.lock().unwrap(), vec![RegionEvent::Enter]);
    // Played once and never reversed
    assert_eq!(page.engine.value(id), Some(1.0));
    assert_eq!(page.engine.host().visual(el).opacity, 1.0);
}

#[test]
fn test_smoothed_progress_is_monotonic() {
    let mut page = Page::new(
        EngineConfig::default(),
        Size::new(1000.0, 800.0),
        Size::new(1000.0, 5000.0),
    );
    let el = page.insert(Bounds::new(0.0, 1500.0, 1000.0, 600.0));
    let view = page.engine.open_view("page");
    let id = page.engine.register(view, TriggerSpec::scrub(el)).unwrap();

    let mut prev = 0.0;
    for step in 0..=80 {
        page.scroll(step as f32 * 40.0);
        let p = page.progress(id);
        assert!((0.0..=1.0).contains(&p));
        assert!(p >= prev, "progress went back from {prev} to {p}");
        prev = p;
    }
    for _ in 0..200 {
        page.frame();
    }
    assert_eq!(page.progress(id), 1.0);

    for step in (0..=80).rev() {
        page.scroll(step as f32 * 40.0);
        let p = page.progress(id);
        assert!(p <= prev);
        prev = p;
    }
}

#[test]
fn test_route_change_mid_scroll_tears_down_route() {
    let mut page = Page::new(
        EngineConfig::default(),
        Size::new(1000.0, 800.0),
        Size::new(1000.0, 5000.0),
    );
    let header = page.insert(Bounds::new(0.0, 0.0, 1000.0, 80.0));
    let hero = page.insert(Bounds::new(0.0, 1200.0, 1000.0, 600.0));

    let chrome = page.engine.open_view("chrome");
    let bar = page
        .engine
        .register(
            chrome,
            TriggerSpec::scrub(header)
                .start(TriggerPoint::top_top())
                .end("+=4000".parse().unwrap()),
        )
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let home = page.engine.route_did_mount("home");
    let region = page
        .engine
        .register(
            home,
            TriggerSpec::scrub(hero).on_update(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    page.engine
        .scroll_to(3000.0, ScrollBehavior::Smooth)
        .unwrap();
    for _ in 0..20 {
        page.frame();
    }
    assert!(page.engine.is_animating());

    page.engine.route_will_change();
    let calls_at_change = calls.load(Ordering::SeqCst);
    assert_eq!(page.engine.lifecycle_state(), LifecycleState::Navigating);
    assert_eq!(page.engine.host().scroll_position(), 0.0);
    assert_eq!(page.engine.scroll_state().smoothed_offset, 0.0);
    assert_eq!(page.engine.progress(region), None);
    assert!(page.engine.progress(bar).is_some());

    // The cancelled tween never writes again
    let writes = page.engine.host().scroll_writes().len();
    for _ in 0..10 {
        page.frame();
    }
    assert_eq!(page.engine.host().scroll_writes().len(), writes);
    assert_eq!(calls.load(Ordering::SeqCst), calls_at_change);
    assert_eq!(page.engine.progress(bar), Some(0.0));

    page.engine.route_did_mount("about");
    assert_eq!(page.engine.lifecycle_state(), LifecycleState::Rebuilding);
    let mut refreshed = false;
    for _ in 0..10 {
        refreshed |= page.frame().refreshed;
    }
    assert!(refreshed);
    assert_eq!(page.engine.lifecycle_state(), LifecycleState::Idle);
}

#[test]
fn test_unregister_is_idempotent() {
    let mut page = Page::new(
        EngineConfig::unsmoothed(),
        Size::new(1000.0, 800.0),
        Size::new(1000.0, 3000.0),
    );
    let el = page.insert(Bounds::new(0.0, 1000.0, 1000.0, 300.0));
    let view = page.engine.open_view("page");
    let id = page.engine.register(view, TriggerSpec::scrub(el)).unwrap();

    assert!(page.engine.unregister(id));
    assert!(!page.engine.unregister(id));
    page.scroll(1000.0);
    assert!(page.engine.registry().is_empty());
}

#[test]
fn test_detached_element_deactivates_only_its_region() {
    let mut page = Page::new(
        EngineConfig::unsmoothed(),
        Size::new(1000.0, 800.0),
        Size::new(1000.0, 3000.0),
    );
    let a = page.insert(Bounds::new(0.0, 1000.0, 1000.0, 300.0));
    let b = page.insert(Bounds::new(0.0, 1000.0, 1000.0, 300.0));
    let view = page.engine.open_view("page");
    let ra = page.engine.register(view, TriggerSpec::scrub(a)).unwrap();
    let rb = page.engine.register(view, TriggerSpec::scrub(b)).unwrap();

    page.scroll(400.0);
    page.engine.host_mut().detach(a);

    let report = page.scroll(800.0);
    assert_eq!(report.faulted, vec![ra]);
    assert!(report.update(rb).is_some());
    assert!(page.progress(rb) > 0.0);

    let report = page.scroll(900.0);
    assert!(report.faulted.is_empty());
    assert!(report.update(ra).is_none());

    // Unregistering a faulted region still works
    assert!(page.engine.unregister(ra));
}

#[test]
fn test_layout_change_needs_refresh() {
    let mut page = Page::new(
        EngineConfig::unsmoothed(),
        Size::new(1000.0, 800.0),
        Size::new(1000.0, 3000.0),
    );
    let el = page.insert(Bounds::new(0.0, 1200.0, 1000.0, 400.0));
    let view = page.engine.open_view("page");
    let id = page.engine.register(view, TriggerSpec::scrub(el)).unwrap();

    page.engine
        .host_mut()
        .set_bounds(el, Bounds::new(0.0, 1600.0, 1000.0, 400.0));
    page.engine.invalidate_layout("image loaded");
    page.scroll(800.0);
    // Still evaluated against the old geometry
    assert!(page.engine.registry().is_stale());
    assert!((page.progress(id) - 400.0 / 1200.0).abs() < 1e-5);

    page.engine.refresh_all().unwrap();
    assert!(!page.engine.registry().is_stale());
    page.frame();
    assert_eq!(page.progress(id), 0.0);
}

#[test]
fn test_resize_refresh_is_debounced() {
    let mut page = Page::new(
        EngineConfig::unsmoothed(),
        Size::new(1000.0, 800.0),
        Size::new(1000.0, 3000.0),
    );
    let el = page.insert(Bounds::new(0.0, 1200.0, 1000.0, 400.0));
    let view = page.engine.open_view("page");
    let id = page.engine.register(view, TriggerSpec::scrub(el)).unwrap();
    assert_eq!(page.engine.registry().span(id).unwrap().start, 400.0);

    page.frame();
    page.engine.host_mut().set_viewport(Size::new(1000.0, 600.0));
    page.engine.on_resize();

    let mut refreshed_at = Vec::new();
    for i in 0..30 {
        if i == 5 {
            page.engine.on_resize();
        }
        if page.frame().refreshed {
            refreshed_at.push(i);
        }
    }

    // One refresh, 200ms after the second resize
    assert_eq!(refreshed_at.len(), 1);
    assert!(refreshed_at[0] > 5 + 11);
    assert_eq!(page.engine.registry().span(id).unwrap().start, 600.0);
}

#[test]
fn test_shutdown_stops_everything() {
    let mut page = Page::new(
        EngineConfig::default(),
        Size::new(1000.0, 800.0),
        Size::new(1000.0, 3000.0),
    );
    page.engine.on_native_scroll(500.0);
    page.frame();
    assert!(page.engine.is_animating());

    page.engine.shutdown();
    assert!(!page.engine.is_animating());
    assert!(page.engine.frame(page.now).is_err());
    assert!(page.engine.scroll_to(0.0, ScrollBehavior::Immediate).is_err());
}
