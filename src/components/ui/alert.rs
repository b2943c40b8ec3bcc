use leptos::prelude::*;
use leptos_ui::clx;

mod components {
    use super::*;
    clx! {Alert, div, "relative flex w-full items-start justify-between gap-3 rounded-md border px-3 py-2 text-sm"}
    clx! {AlertDescription, p, "text-xs leading-relaxed"}
}

pub use components::*;
