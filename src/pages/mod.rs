use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Input, Label, Spinner, Textarea,
};
use crate::config::AppConfig;
use crate::error::NoteError;
use crate::models::{Color, DrawMode, NoteSummary, ToolState, COLOR_PRESETS, WEIGHT_PRESETS};
use crate::recognition::{RecognitionGateway, TesseractEngine};
use crate::session::{EditorState, LoadOutcome, NoteSession, RecognizeOutcome};
use crate::storage::LocalStorage as BrowserStorage;
use crate::store::NoteStore;
use crate::surface::CanvasSurface;
use crate::util::format_timestamp;
use icons::X;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use tracing::{error, warn};

type BrowserSession = NoteSession<CanvasSurface, TesseractEngine, BrowserStorage>;

const DELETE_PROMPT: &str = "Are you sure you want to delete this note?";

fn ask_delete() -> bool {
    window().confirm_with_message(DELETE_PROMPT).unwrap_or(false)
}

fn build_session(canvas: web_sys::HtmlCanvasElement) -> Result<BrowserSession, NoteError> {
    let config = AppConfig::from_window();
    let surface = CanvasSurface::attach(canvas, &config.surface(), &ToolState::default())?;
    let gateway = RecognitionGateway::new(
        TesseractEngine::new(config.ocr_timeout_ms),
        config.ocr_language.clone(),
    );
    let store = NoteStore::open(BrowserStorage, config.storage_key);
    Ok(NoteSession::new(surface, gateway, store))
}

/// The note editor: a sidebar of saved notes plus the drawing canvas, title
/// and recognized text of the open one.
#[component]
pub fn NotesPage() -> impl IntoView {
    let canvas_ref: NodeRef<html::Canvas> = NodeRef::new();

    // The session owns JS handles, so it lives in thread-local arena storage.
    let session = StoredValue::new_local(None::<BrowserSession>);

    let notes: RwSignal<Vec<NoteSummary>> = RwSignal::new(Vec::new());
    let editor: RwSignal<EditorState> = RwSignal::new(EditorState::default());
    let title: RwSignal<String> = RwSignal::new(String::new());
    let text: RwSignal<String> = RwSignal::new(String::new());
    let notice: RwSignal<Option<String>> = RwSignal::new(None);

    // Pull everything the view shows back out of the session.
    let sync = move || {
        let Some(s) = session.get_value() else {
            return;
        };
        let st = s.state();
        notes.set(s.notes());
        title.set(st.pending_title.clone());
        text.set(st.pending_text.clone());
        editor.set(st);
    };

    let report = move |e: NoteError| notice.set(Some(e.to_string()));

    // Attach once the canvas is mounted.
    Effect::new(move |_| {
        let Some(canvas) = canvas_ref.get() else {
            return;
        };
        if session.with_value(Option::is_some) {
            return;
        }

        match build_session(canvas) {
            Ok(s) => {
                if let Some(e) = s.take_store_error() {
                    warn!(error = %e, "starting with an empty note list");
                    report(e);
                }
                session.set_value(Some(s));
                sync();
            }
            Err(e) => {
                error!(error = %e, "note editor unavailable");
                report(e);
            }
        }
    });

    let on_new = move |_: web_sys::MouseEvent| {
        let Some(s) = session.get_value() else {
            return;
        };
        notice.set(None);
        s.create_new();
        sync();
    };

    let on_select = move |id: String| {
        let Some(s) = session.get_value() else {
            return;
        };
        notice.set(None);
        editor.update(|st| st.loading = Some(id.clone()));
        spawn_local(async move {
            match s.select(&id).await {
                Ok(LoadOutcome::Applied) => sync(),
                // The newer request syncs when it lands.
                Ok(LoadOutcome::Superseded) => {}
                Err(e) => {
                    report(e);
                    sync();
                }
            }
        });
    };

    let on_delete = move |id: String| {
        let Some(s) = session.get_value() else {
            return;
        };
        match s.delete_confirmed(&id, |_| ask_delete()) {
            Ok(true) => notice.set(None),
            Ok(false) => {}
            Err(e) => report(e),
        }
        sync();
    };

    let on_save = move |_: web_sys::MouseEvent| {
        let Some(s) = session.get_value() else {
            return;
        };
        match s.save() {
            Ok(_) => notice.set(None),
            Err(e) => report(e),
        }
        sync();
    };

    let on_recognize = move |_: web_sys::MouseEvent| {
        let Some(s) = session.get_value() else {
            return;
        };
        if editor.get_untracked().is_recognizing {
            return;
        }
        notice.set(None);
        editor.update(|st| st.is_recognizing = true);
        spawn_local(async move {
            match s.recognize_text().await {
                Ok(RecognizeOutcome::Merged(_)) | Ok(RecognizeOutcome::Discarded) => {}
                Err(e) => report(e),
            }
            sync();
        });
    };

    let on_clear = move |_: web_sys::MouseEvent| {
        if let Some(s) = session.get_value() {
            if let Err(e) = s.clear_canvas() {
                report(e);
            }
        }
    };

    let pick_color = move |color: Color| {
        if let Some(s) = session.get_value() {
            s.set_color(color);
            sync();
        }
    };

    let pick_weight = move |weight: u32| {
        if let Some(s) = session.get_value() {
            s.set_weight(weight);
            sync();
        }
    };

    let pick_mode = move |mode: DrawMode| {
        if let Some(s) = session.get_value() {
            s.set_draw_mode(mode);
            sync();
        }
    };

    let on_title = Callback::new(move |v: String| {
        if let Some(s) = session.get_value() {
            s.set_pending_title(v);
        }
    });

    let on_text = Callback::new(move |v: String| {
        if let Some(s) = session.get_value() {
            s.set_pending_text(v);
        }
    });

    let is_editing = move || editor.with(|st| st.mode.is_editing());
    let open_id = move || editor.with(|st| st.mode.note_id().map(str::to_string));

    view! {
        <div class="flex h-screen w-full bg-background text-foreground">
            <aside class="flex w-64 shrink-0 flex-col border-r border-border">
                <div class="flex items-center justify-between gap-2 border-b border-border px-3 py-3">
                    <h2 class="text-sm font-semibold">"Notes"</h2>
                    <Button size=ButtonSize::Sm on:click=on_new>
                        "New Note"
                    </Button>
                </div>

                <Show
                    when=move || !notes.with(Vec::is_empty)
                    fallback=|| view! {
                        <p class="px-3 py-4 text-xs text-muted-foreground">"No saved notes yet."</p>
                    }
                >
                    <ul class="flex-1 overflow-y-auto p-2">
                        {move || {
                            let current = open_id();
                            let loading = editor.with(|st| st.loading.clone());
                            notes
                                .get()
                                .into_iter()
                                .map(|n| {
                                    let is_selected = current.as_deref() == Some(n.id.as_str());
                                    let is_loading = loading.as_deref() == Some(n.id.as_str());
                                    let variant = if is_selected {
                                        ButtonVariant::ToolActive
                                    } else {
                                        ButtonVariant::Ghost
                                    };
                                    let id_select = n.id.clone();
                                    let id_delete = n.id.clone();
                                    let stamp = format_timestamp(n.updated_at);

                                    view! {
                                        <li class="group flex items-center gap-1">
                                            <Button
                                                variant=variant
                                                size=ButtonSize::Sm
                                                class="h-auto min-w-0 flex-1 flex-col items-start py-1.5"
                                                attr:aria-current=move || if is_selected { Some("page") } else { None }
                                                on:click=move |_| on_select(id_select.clone())
                                            >
                                                <span class="w-full truncate text-left">{n.title}</span>
                                                <span class="text-[11px] opacity-70">{stamp}</span>
                                            </Button>
                                            <Show when=move || is_loading>
                                                <Spinner class="size-3" />
                                            </Show>
                                            <Button
                                                variant=ButtonVariant::Ghost
                                                size=ButtonSize::Icon
                                                class="opacity-0 group-hover:opacity-100"
                                                attr:title="Delete note"
                                                on:click=move |ev: web_sys::MouseEvent| {
                                                    ev.stop_propagation();
                                                    on_delete(id_delete.clone());
                                                }
                                            >
                                                <X />
                                            </Button>
                                        </li>
                                    }
                                })
                                .collect_view()
                        }}
                    </ul>
                </Show>
            </aside>

            <main class="flex min-w-0 flex-1 flex-col gap-3 overflow-y-auto p-4">
                <Show when=move || notice.with(Option::is_some)>
                    <Alert class="border-destructive/40 bg-destructive/5">
                        <AlertDescription class="text-destructive">
                            {move || notice.get().unwrap_or_default()}
                        </AlertDescription>
                        <Button
                            variant=ButtonVariant::Ghost
                            size=ButtonSize::Icon
                            attr:title="Dismiss"
                            on:click=move |_| notice.set(None)
                        >
                            <X />
                        </Button>
                    </Alert>
                </Show>

                <Show when=move || !is_editing()>
                    <div class="flex flex-1 items-center justify-center text-sm text-muted-foreground">
                        "Select a note from the list or create a new one."
                    </div>
                </Show>

                // Always mounted so the canvas binding survives switching notes.
                <div class="flex flex-col gap-3" class:hidden=move || !is_editing()>
                    <div>
                        <Label html_for="note-title">"Title"</Label>
                        <Input
                            id="note-title"
                            placeholder="Untitled note"
                            bind_value=title
                            on_value=on_title
                        />
                    </div>

                    <div class="flex flex-wrap items-center gap-3">
                        <div class="flex items-center gap-1">
                            {move || {
                                let current = editor.with(|st| st.tool.color);
                                COLOR_PRESETS
                                    .iter()
                                    .map(|&(name, color)| {
                                        let variant = if color == current {
                                            ButtonVariant::ToolActive
                                        } else {
                                            ButtonVariant::Tool
                                        };
                                        view! {
                                            <Button
                                                variant=variant
                                                size=ButtonSize::Icon
                                                attr:title=name
                                                on:click=move |_| pick_color(color)
                                            >
                                                <span
                                                    class="size-4 rounded-full"
                                                    style=format!("background-color: {}", color.to_hex())
                                                ></span>
                                            </Button>
                                        }
                                    })
                                    .collect_view()
                            }}
                        </div>

                        <div class="flex items-center gap-1">
                            {move || {
                                let current = editor.with(|st| st.tool.weight);
                                WEIGHT_PRESETS
                                    .iter()
                                    .map(|&(name, weight)| {
                                        let variant = if weight == current {
                                            ButtonVariant::ToolActive
                                        } else {
                                            ButtonVariant::Tool
                                        };
                                        view! {
                                            <Button
                                                variant=variant
                                                size=ButtonSize::Xs
                                                on:click=move |_| pick_weight(weight)
                                            >
                                                {name}
                                            </Button>
                                        }
                                    })
                                    .collect_view()
                            }}
                        </div>

                        <div class="flex items-center gap-1">
                            {move || {
                                let current = editor.with(|st| st.tool.mode);
                                [("Draw", DrawMode::Draw), ("Erase", DrawMode::Erase)]
                                    .into_iter()
                                    .map(|(label, mode)| {
                                        let variant = if mode == current {
                                            ButtonVariant::ToolActive
                                        } else {
                                            ButtonVariant::Tool
                                        };
                                        view! {
                                            <Button
                                                variant=variant
                                                size=ButtonSize::Xs
                                                on:click=move |_| pick_mode(mode)
                                            >
                                                {label}
                                            </Button>
                                        }
                                    })
                                    .collect_view()
                            }}
                        </div>

                        <div class="ml-auto flex items-center gap-2">
                            <Button variant=ButtonVariant::Destructive size=ButtonSize::Sm on:click=on_clear>
                                "Clear Canvas"
                            </Button>
                            <Button
                                variant=ButtonVariant::Outline
                                size=ButtonSize::Sm
                                attr:disabled=move || editor.with(|st| st.is_recognizing)
                                on:click=on_recognize
                            >
                                <Show
                                    when=move || editor.with(|st| st.is_recognizing)
                                    fallback=|| view! { "Recognize Text" }
                                >
                                    <Spinner />
                                    "Recognizing..."
                                </Show>
                            </Button>
                        </div>
                    </div>

                    <div class="overflow-auto rounded-md border border-border bg-white">
                        <canvas node_ref=canvas_ref class="block touch-none"></canvas>
                    </div>

                    <div>
                        <Label html_for="note-text">"Recognized text"</Label>
                        <Textarea
                            id="note-text"
                            placeholder="Recognized text appears here; edit freely."
                            bind_value=text
                            on_value=on_text
                        />
                    </div>

                    <div class="flex justify-end">
                        <Button
                            attr:disabled=move || editor.with(|st| st.is_saving)
                            on:click=on_save
                        >
                            {move || if editor.with(|st| st.is_saving) { "Saving..." } else { "Save Note" }}
                        </Button>
                    </div>
                </div>
            </main>
        </div>
    }
}
