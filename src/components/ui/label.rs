use leptos::prelude::*;
use tw_merge::*;

#[component]
pub fn Label(
    #[prop(optional, into)] class: String,
    #[prop(optional, into)] html_for: String,
    children: Children,
) -> impl IntoView {
    let class = tw_merge!(
        "mb-2 block text-xs font-medium leading-none text-muted-foreground select-none",
        class
    );

    view! {
        <label class=class r#for=html_for>
            {children()}
        </label>
    }
}
