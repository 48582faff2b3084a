use std::cell::RefCell;
use std::rc::Rc;

use log::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Window};
use yew::prelude::*;
use yew_router::prelude::*;

use crate::config::{self, NavConfig};
use crate::Route;

/// Scroll-driven visibility of the sticky nav. Scroll events only request a
/// frame; the position is read once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavVisibility {
    threshold: f64,
    ticking: bool,
    visible: bool,
}

impl NavVisibility {
    pub fn new(config: NavConfig) -> Self {
        Self {
            threshold: config.scroll_threshold,
            ticking: false,
            visible: false,
        }
    }

    #[cfg(test)]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Returns true when the caller has to request an animation frame.
    pub fn on_scroll(&mut self) -> bool {
        if self.ticking {
            return false;
        }
        self.ticking = true;
        true
    }

    /// Recomputes visibility for `scroll_y`, `Some` only on change.
    pub fn update(&mut self, scroll_y: f64) -> Option<bool> {
        self.ticking = false;
        let visible = scroll_y > self.threshold;
        if visible == self.visible {
            return None;
        }
        self.visible = visible;
        Some(visible)
    }
}

struct ScrollListener {
    window: Window,
    callback: Closure<dyn FnMut()>,
}

impl Drop for ScrollListener {
    fn drop(&mut self) {
        if let Err(e) = self
            .window
            .remove_event_listener_with_callback("scroll", self.callback.as_ref().unchecked_ref())
        {
            warn!("Failed to remove nav scroll listener: {:?}", e);
        }
    }
}

fn listen_scroll(visible: UseStateHandle<bool>) -> Option<ScrollListener> {
    let window = web_sys::window()?;
    let state = Rc::new(RefCell::new(NavVisibility::new(NavConfig::default())));

    let update = {
        let window = window.clone();
        let state = state.clone();
        let visible = visible.clone();
        Rc::new(move || {
            let scroll_y = window.scroll_y().unwrap_or(0.0);
            if let Some(now_visible) = state.borrow_mut().update(scroll_y) {
                visible.set(now_visible);
            }
        })
    };

    let callback = {
        let window = window.clone();
        let update = update.clone();
        Closure::<dyn FnMut()>::new(move || {
            if !state.borrow_mut().on_scroll() {
                return;
            }
            let update = update.clone();
            let frame = Closure::once_into_js(move |_timestamp: f64| update());
            if let Err(e) = window.request_animation_frame(frame.unchecked_ref()) {
                warn!("Nav frame request failed: {:?}", e);
            }
        })
    };

    let options = AddEventListenerOptions::new();
    options.set_passive(true);
    if let Err(e) = window.add_event_listener_with_callback_and_add_event_listener_options(
        "scroll",
        callback.as_ref().unchecked_ref(),
        &options,
    ) {
        warn!("Failed to listen for scroll, nav stays hidden: {:?}", e);
        return None;
    }

    // Pages restored mid-scroll need the right state before the first event
    update();

    Some(ScrollListener { window, callback })
}

#[function_component(Nav)]
pub fn nav() -> Html {
    let visible = use_state(|| false);

    {
        let visible = visible.clone();
        use_effect_with_deps(
            move |_| {
                let listener = listen_scroll(visible);
                move || drop(listener)
            },
            (),
        );
    }

    html! {
        <nav
            id={config::NAV_ID}
            class={classes!("top-nav", (*visible).then(|| config::VISIBLE_CLASS))}
        >
            <div class="nav-content">
                <Link<Route> to={Route::Home} classes="nav-logo">
                    {"quietline"}
                </Link<Route>>
                <div class="nav-right">
                    <a href="#features" class="nav-link">{"Features"}</a>
                    <a href="#numbers" class="nav-link">{"Numbers"}</a>
                    <a href="#get-started" class="nav-login-button">{"Get started"}</a>
                </div>
            </div>
        </nav>
    }
}
