use log::warn;
use yew::prelude::*;

use crate::config::RevealConfig;
use crate::reveal::dom::RevealDriver;

fn attach_reveal() -> Option<RevealDriver> {
    let document = web_sys::window().and_then(|w| w.document())?;
    match RevealDriver::attach(&document, RevealConfig::default()) {
        Ok(driver) => driver,
        Err(e) => {
            warn!("Reveal animations disabled: {}", e);
            None
        }
    }
}

#[derive(Properties, PartialEq)]
struct StatProps {
    target: AttrValue,
    label: AttrValue,
}

#[function_component(Stat)]
fn stat(props: &StatProps) -> Html {
    html! {
        <div class="stat">
            <span class="counter" data-target={props.target.clone()}>{"0"}</span>
            <span class="stat-label">{props.label.clone()}</span>
        </div>
    }
}

#[function_component(Landing)]
pub fn landing() -> Html {
    // Scan the rendered markup once, detach on unmount
    use_effect_with_deps(
        move |_| {
            let driver = attach_reveal();
            move || drop(driver)
        },
        (),
    );

    html! {
        <div class="landing-page">
            <header class="hero">
                <div class="hero-background"></div>
                <div class="hero-content">
                    <h1>{"Your phone, only when it matters"}</h1>
                    <p class="hero-subtitle">
                        {"quietline holds back the noise and calls you for the few messages that can't wait."}
                    </p>
                    <a href="#get-started" class="hero-cta">{"Get started"}</a>
                </div>
            </header>

            <section id="features" class="feature-block" data-animate="">
                <div class="feature-content">
                    <h2>{"Filter the noise"}</h2>
                    <ul class="feature-list">
                        <li>{"Instant alerts for critical messages"}</li>
                        <li>{"Scheduled summaries of everything else"}</li>
                        <li>{"Priority senders always get through"}</li>
                    </ul>
                </div>
            </section>

            <section id="numbers" class="stats-block" data-animate="">
                <h2>{"In numbers"}</h2>
                <div class="stats-grid">
                    <Stat target="2500" label="people going light" />
                    <Stat target="184000" label="notifications held back" />
                    <Stat target="97" label="percent fewer screen checks" />
                    <Stat target="N/A" label="ads, ever" />
                </div>
            </section>

            <section class="feature-block" data-animate="">
                <div class="feature-content">
                    <h2>{"Works with the phone you have"}</h2>
                    <p>{"SMS and calls reach any handset, smart or not."}</p>
                </div>
            </section>

            <section id="get-started" class="cta-block" data-animate="">
                <h2>{"Start going light"}</h2>
                <a href="/" class="hero-cta">{"Create account"}</a>
            </section>
        </div>
    }
}
