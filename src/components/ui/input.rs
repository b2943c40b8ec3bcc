use leptos::html;
use leptos::prelude::*;
use tw_merge::tw_merge;
use wasm_bindgen::JsCast;

const FIELD_CLASS: &str = "placeholder:text-muted-foreground selection:bg-primary selection:text-primary-foreground border-input w-full min-w-0 rounded-md border bg-transparent px-3 py-1 text-sm shadow-xs transition-[color,box-shadow] outline-none focus-visible:border-ring focus-visible:ring-ring/50 focus-visible:ring-2 disabled:pointer-events-none disabled:cursor-not-allowed disabled:opacity-50";

fn event_value(ev: &web_sys::Event) -> Option<String> {
    let target = ev.target()?;
    if let Some(input) = target.dyn_ref::<web_sys::HtmlInputElement>() {
        return Some(input.value());
    }
    target
        .dyn_ref::<web_sys::HtmlTextAreaElement>()
        .map(|area| area.value())
}

/// Single-line text field bound to `bind_value`.
///
/// `on_value` fires after the signal is updated, for callers that mirror the
/// value elsewhere.
#[component]
pub fn Input(
    #[prop(into, optional)] class: String,
    #[prop(into, default = "text")] r#type: &'static str,
    #[prop(into, optional)] placeholder: String,
    #[prop(into, optional)] id: String,
    #[prop(into)] bind_value: RwSignal<String>,
    #[prop(optional, into)] on_value: Option<Callback<String>>,
    #[prop(optional)] node_ref: NodeRef<html::Input>,
) -> impl IntoView {
    let merged_class = tw_merge!(FIELD_CLASS, "flex h-9", class);

    // `bind:value` changed shape across Leptos releases; wire it by hand.
    let on_input = move |ev: web_sys::Event| {
        if let Some(value) = event_value(&ev) {
            bind_value.set(value.clone());
            if let Some(cb) = on_value {
                cb.run(value);
            }
        }
    };

    view! {
        <input
            data-name="Input"
            type=r#type
            class=merged_class
            placeholder=placeholder
            id=id
            prop:value=move || bind_value.get()
            on:input=on_input
            node_ref=node_ref
        />
    }
}

/// Multi-line counterpart of [`Input`].
#[component]
pub fn Textarea(
    #[prop(into, optional)] class: String,
    #[prop(into, optional)] placeholder: String,
    #[prop(into, optional)] id: String,
    #[prop(default = 6)] rows: u32,
    #[prop(into)] bind_value: RwSignal<String>,
    #[prop(optional, into)] on_value: Option<Callback<String>>,
) -> impl IntoView {
    let merged_class = tw_merge!(FIELD_CLASS, "min-h-24 resize-y py-2 leading-relaxed", class);

    let on_input = move |ev: web_sys::Event| {
        if let Some(value) = event_value(&ev) {
            bind_value.set(value.clone());
            if let Some(cb) = on_value {
                cb.run(value);
            }
        }
    };

    view! {
        <textarea
            data-name="Textarea"
            class=merged_class
            placeholder=placeholder
            id=id
            rows=rows
            prop:value=move || bind_value.get()
            on:input=on_input
        ></textarea>
    }
}
