use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use log::{debug, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::js_sys::{Array, Function, Reflect};
use web_sys::{
    Document, Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit,
    Node, Window,
};

use crate::config::{self, RevealConfig};

use super::counter::CounterPhase;
use super::{
    CounterId, Detection, Effect, ElementId, IntersectionEntry, RevealError, RevealResult,
    ViewportRevealCoordinator,
};

type IntersectCallback = Closure<dyn FnMut(Array, IntersectionObserver)>;

/// Binds a [`ViewportRevealCoordinator`] to the live document. Dropping the
/// driver disconnects the observer, cancels the safety timer and turns any
/// animation frame still in flight into a no-op.
pub struct RevealDriver {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    coordinator: ViewportRevealCoordinator,
    elements: Vec<Element>,
    counters: Vec<Element>,
    observer: Option<IntersectionObserver>,
    on_intersect: Option<IntersectCallback>,
    safety_timer: Option<Timeout>,
    active: bool,
}

impl Inner {
    fn element(&self, id: ElementId) -> RevealResult<&Element> {
        self.elements.get(id.0).ok_or(RevealError::UnknownElement(id))
    }

    fn counter(&self, id: CounterId) -> RevealResult<&Element> {
        self.counters.get(id.0).ok_or(RevealError::UnknownCounter(id))
    }

    fn element_id(&self, target: &Element) -> Option<ElementId> {
        self.elements.iter().position(|el| el == target).map(ElementId)
    }

    fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.on_intersect = None;
        self.safety_timer = None;
    }
}

impl RevealDriver {
    /// Scans `document` for revealable sections and counters and starts
    /// tracking them. Returns `Ok(None)` when the page has neither.
    pub fn attach(document: &Document, config: RevealConfig) -> RevealResult<Option<Self>> {
        let elements = query_all(document, config::REVEAL_SELECTOR)?;
        let counters = query_all(document, config::COUNTER_SELECTOR)?;
        if elements.is_empty() && counters.is_empty() {
            debug!("No revealable elements on page, reveal disabled");
            return Ok(None);
        }

        let mut coordinator = ViewportRevealCoordinator::new(config);
        for _ in &elements {
            coordinator.register_element();
        }
        for counter in &counters {
            let node: &Node = counter;
            let owners: Vec<ElementId> = elements
                .iter()
                .enumerate()
                .filter(|(_, el)| el.contains(Some(node)))
                .map(|(index, _)| ElementId(index))
                .collect();
            let raw = counter
                .get_attribute(config::COUNTER_TARGET_ATTR)
                .unwrap_or_default();
            coordinator.register_counter(&raw, &owners)?;
        }

        info!(
            "Attaching reveal driver: {} elements, {} counters",
            coordinator.element_count(),
            coordinator.counter_count()
        );

        let inner = Rc::new(RefCell::new(Inner {
            coordinator,
            elements,
            counters,
            observer: None,
            on_intersect: None,
            safety_timer: None,
            active: true,
        }));

        let detection = match install_observer(&inner) {
            Ok(detection) => detection,
            Err(err) => {
                warn!("Intersection observer setup failed, revealing everything: {}", err);
                Detection::Unavailable
            }
        };
        info!("Reveal detection: {:?}", detection);

        let effects = inner.borrow_mut().coordinator.start(detection)?;
        apply(&inner, effects);

        Ok(Some(RevealDriver { inner }))
    }
}

impl Drop for RevealDriver {
    fn drop(&mut self) {
        self.inner.borrow_mut().shutdown();
        info!("Reveal driver detached");
    }
}

fn query_all(document: &Document, selector: &str) -> RevealResult<Vec<Element>> {
    let nodes = document
        .query_selector_all(selector)
        .map_err(|e| RevealError::dom(&e))?;
    Ok((0..nodes.length())
        .filter_map(|i| nodes.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

fn window() -> RevealResult<Window> {
    web_sys::window().ok_or_else(|| RevealError::Dom("no window".to_string()))
}

fn supports_intersection_observer(window: &Window) -> bool {
    Reflect::has(window, &JsValue::from_str("IntersectionObserver")).unwrap_or(false)
}

fn install_observer(inner: &Rc<RefCell<Inner>>) -> RevealResult<Detection> {
    let window = window()?;
    if !supports_intersection_observer(&window) {
        return Ok(Detection::Unavailable);
    }

    let weak = Rc::downgrade(inner);
    let callback: IntersectCallback =
        Closure::new(move |entries: Array, _observer: IntersectionObserver| {
            if let Some(inner) = weak.upgrade() {
                on_intersections(&inner, entries);
            }
        });

    let options = IntersectionObserverInit::new();
    {
        let state = inner.borrow();
        options.set_threshold(&JsValue::from_f64(state.coordinator.config().threshold));
        options.set_root_margin(&state.coordinator.config().root_margin);
    }
    let observer =
        IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)
            .map_err(|e| RevealError::dom(&e))?;

    let mut state = inner.borrow_mut();
    state.observer = Some(observer);
    state.on_intersect = Some(callback);
    Ok(Detection::Available)
}

fn on_intersections(inner: &Rc<RefCell<Inner>>, entries: Array) {
    let batch: Vec<IntersectionEntry> = {
        let state = inner.borrow();
        if !state.active {
            return;
        }
        entries
            .iter()
            .filter_map(|value| value.dyn_into::<IntersectionObserverEntry>().ok())
            .filter_map(|entry| {
                let element = state.element_id(&entry.target())?;
                Some(IntersectionEntry {
                    element,
                    is_intersecting: entry.is_intersecting(),
                })
            })
            .collect()
    };

    let result = inner.borrow_mut().coordinator.on_intersection(&batch);
    match result {
        Ok(effects) => apply(inner, effects),
        Err(err) => warn!("Dropping intersection batch: {}", err),
    }
}

fn on_frame(inner: &Rc<RefCell<Inner>>, id: CounterId, timestamp: f64) {
    if !inner.borrow().active {
        return;
    }
    let result = inner.borrow_mut().coordinator.on_frame(id, timestamp);
    match result {
        Ok(effects) => {
            let advanced = !effects.is_empty();
            apply(inner, effects);

            let state = inner.borrow();
            if advanced && state.coordinator.counter_phase(id) == Ok(CounterPhase::Finished) {
                debug!(
                    "Counter {:?} finished at {:?}",
                    id,
                    state.coordinator.displayed_value(id).ok().flatten()
                );
                if state.coordinator.is_settled() {
                    debug!("All sections revealed and counters finished");
                }
            }
        }
        Err(err) => warn!("Counter frame failed: {}", err),
    }
}

fn on_safety_timeout(inner: &Rc<RefCell<Inner>>) {
    if !inner.borrow().active {
        return;
    }
    let result = inner.borrow_mut().coordinator.safety_sweep();
    match result {
        Ok(effects) => {
            let forced = effects
                .iter()
                .filter(|e| matches!(e, Effect::MarkVisible(_)))
                .count();
            if forced > 0 {
                info!("Safety sweep revealed {} element(s)", forced);
            }
            apply(inner, effects)
        }
        Err(err) => warn!("Safety sweep failed: {}", err),
    }
}

fn apply(inner: &Rc<RefCell<Inner>>, effects: Vec<Effect>) {
    for effect in effects {
        if let Err(err) = apply_one(inner, effect) {
            warn!("Reveal effect failed: {}", err);
        }
    }
}

fn apply_one(inner: &Rc<RefCell<Inner>>, effect: Effect) -> RevealResult<()> {
    match effect {
        Effect::Observe(id) => {
            let state = inner.borrow();
            if let Some(observer) = &state.observer {
                observer.observe(state.element(id)?);
            }
        }
        Effect::Unobserve(id) => {
            let state = inner.borrow();
            if let Some(observer) = &state.observer {
                observer.unobserve(state.element(id)?);
            }
        }
        Effect::MarkVisible(id) => {
            let marked = mark_visible(&inner.borrow(), id);
            if marked.is_err() {
                // Leave it to the safety sweep
                inner.borrow_mut().coordinator.reveal_failed(id)?;
            }
            marked?;
            debug!("Revealed {:?}", id);
        }
        Effect::SetText(id, text) => {
            inner.borrow().counter(id)?.set_text_content(Some(&text));
        }
        Effect::RequestFrame(id) => request_frame(inner, id)?,
        Effect::ArmSafetyTimer(ms) => {
            let weak = Rc::downgrade(inner);
            let timeout = Timeout::new(ms, move || {
                if let Some(inner) = weak.upgrade() {
                    on_safety_timeout(&inner);
                }
            });
            inner.borrow_mut().safety_timer = Some(timeout);
        }
    }
    Ok(())
}

fn mark_visible(state: &Inner, id: ElementId) -> RevealResult<()> {
    state
        .element(id)?
        .class_list()
        .add_1(config::VISIBLE_CLASS)
        .map_err(|e| RevealError::dom(&e))
}

fn request_frame(inner: &Rc<RefCell<Inner>>, id: CounterId) -> RevealResult<()> {
    let weak = Rc::downgrade(inner);
    let callback = Closure::once_into_js(move |timestamp: f64| {
        if let Some(inner) = weak.upgrade() {
            on_frame(&inner, id, timestamp);
        }
    });
    window()?
        .request_animation_frame(callback.unchecked_ref::<Function>())
        .map_err(|e| RevealError::dom(&e))?;
    Ok(())
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn document() -> Document {
        web_sys::window().unwrap().document().unwrap()
    }

    /// Mounts `html` in a fresh container under the root element.
    fn mount(html: &str) -> Element {
        let doc = document();
        let container = doc.create_element("div").unwrap();
        container.set_inner_html(html);
        doc.document_element().unwrap().append_child(&container).unwrap();
        container
    }

    fn select(container: &Element, selector: &str) -> Element {
        container.query_selector(selector).unwrap().unwrap()
    }

    #[wasm_bindgen_test]
    fn test_attach_without_markup_is_disabled() {
        let driver = RevealDriver::attach(&document(), RevealConfig::default()).unwrap();
        assert!(driver.is_none());
    }

    #[wasm_bindgen_test]
    fn test_attach_assigns_nested_counters_to_sections() {
        let container = mount(
            r#"<section id="outer" data-animate="">
                 <div><span id="deep" class="counter" data-target="40">0</span></div>
               </section>
               <span id="loose" class="counter" data-target="7">0</span>"#,
        );
        let driver = RevealDriver::attach(&document(), RevealConfig::default())
            .unwrap()
            .unwrap();

        {
            let mut state = driver.inner.borrow_mut();
            assert_eq!(state.coordinator.element_count(), 1);
            assert_eq!(state.coordinator.counter_count(), 2);

            // the loose counter started on attach, the nested one waits for its section
            assert_eq!(
                state.coordinator.counter_phase(CounterId(1)),
                Ok(CounterPhase::Running)
            );
            assert_eq!(
                state.coordinator.counter_phase(CounterId(0)),
                Ok(CounterPhase::Idle)
            );
            assert_eq!(
                state.coordinator.start_counters(ElementId(0)).unwrap(),
                vec![Effect::RequestFrame(CounterId(0))]
            );
        }

        drop(driver);
        container.remove();
    }

    #[wasm_bindgen_test]
    fn test_observer_targets_map_back_to_ids() {
        let container = mount(
            r#"<section id="first" data-animate=""></section>
               <section id="second" data-animate=""></section>
               <p id="other"></p>"#,
        );
        let driver = RevealDriver::attach(&document(), RevealConfig::default())
            .unwrap()
            .unwrap();

        {
            let state = driver.inner.borrow();
            assert_eq!(
                state.element_id(&select(&container, "#first")),
                Some(ElementId(0))
            );
            assert_eq!(
                state.element_id(&select(&container, "#second")),
                Some(ElementId(1))
            );
            assert_eq!(state.element_id(&select(&container, "#other")), None);
        }

        drop(driver);
        container.remove();
    }

    #[wasm_bindgen_test]
    fn test_mark_visible_adds_class() {
        let container = mount(r#"<section id="s" data-animate=""></section>"#);
        let driver = RevealDriver::attach(&document(), RevealConfig::default())
            .unwrap()
            .unwrap();

        let effects = driver
            .inner
            .borrow_mut()
            .coordinator
            .reveal(ElementId(0))
            .unwrap();
        apply(&driver.inner, effects);
        assert!(select(&container, "#s")
            .class_list()
            .contains(config::VISIBLE_CLASS));

        drop(driver);
        container.remove();
    }

    #[wasm_bindgen_test]
    fn test_frames_after_drop_do_nothing() {
        let container = mount(r#"<span id="c" class="counter" data-target="900">0</span>"#);
        let driver = RevealDriver::attach(&document(), RevealConfig::default())
            .unwrap()
            .unwrap();
        let inner = driver.inner.clone();
        let weak = Rc::downgrade(&driver.inner);

        drop(driver);
        assert!(!inner.borrow().active);
        assert!(inner.borrow().observer.is_none());

        on_frame(&inner, CounterId(0), 0.0);
        on_frame(&inner, CounterId(0), 5000.0);
        assert_eq!(
            select(&container, "#c").text_content().as_deref(),
            Some("0")
        );

        drop(inner);
        assert!(weak.upgrade().is_none());
        container.remove();
    }
}
