use crate::auth::{guard_route, has_session_token, RouteDecision};
use crate::config::AppConfig;
use crate::pages::NotesPage;
use crate::storage::LocalStorage as BrowserStorage;
use leptos::prelude::*;
use leptos_router::components::{Redirect, Route, Router, Routes};
use leptos_router::hooks::use_location;
use leptos_router::path;
use tracing::info;

/// Renders `children` only when the current path may be shown; otherwise sends
/// the browser to the path the guard picked.
#[component]
pub fn RequireSession(children: ChildrenFn) -> impl IntoView {
    let location = use_location();
    let token_key = AppConfig::from_window().token_key;

    let decision = Memo::new(move |_| {
        let path = location.pathname.get();
        guard_route(&path, has_session_token(&BrowserStorage, &token_key))
    });

    Effect::new(move |_| {
        if let RouteDecision::Redirect(to) = decision.get() {
            info!(to, "redirecting");
            let _ = window().location().set_href(to);
        }
    });

    // Store children so the view macro sees an `Fn` (not an `FnOnce`).
    let children = StoredValue::new(children);

    view! {
        <Show when=move || decision.get() == RouteDecision::Allow>
            {move || children.with_value(|c| c())}
        </Show>
    }
}

#[component]
pub fn App() -> impl IntoView {
    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("notes") view=move || view! {
                    <RequireSession>
                        <NotesPage />
                    </RequireSession>
                } />
                <Route path=path!("") view=|| view! { <Redirect path="/notes" /> } />
            </Routes>
        </Router>
    }
}
