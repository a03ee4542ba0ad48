use crate::api::{self, ApiError};
use seed::{self, prelude::*, *};
use shared::form::{FormState, SubmitOutcome};
use shared::{AppConfig, Record};
use std::rc::Rc;
use wasm_bindgen::JsCast;

/// Notification sent once per successful creation.
#[derive(Debug, Clone)]
pub struct Created(pub Record);

pub struct Model {
    config: Rc<AppConfig>,
    form: FormState<web_sys::File>,
}

pub enum Msg {
    TitleChanged(String),
    DescriptionChanged(String),
    ImageSelected(web_sys::File),
    ImageRemoved,
    Submit,
    Submitted(Result<Record, ApiError>),
}

pub fn init(config: Rc<AppConfig>) -> Model {
    Model {
        config,
        form: FormState::default(),
    }
}

fn revoke_preview(preview: Option<String>) {
    if let Some(url) = preview {
        let _ = web_sys::Url::revoke_object_url(&url);
    }
}

pub fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::TitleChanged(title) => model.form.title = title,

        Msg::DescriptionChanged(description) => model.form.description = description,

        Msg::ImageSelected(file) => {
            let preview = web_sys::Url::create_object_url_with_blob(&file).ok();
            revoke_preview(model.form.select_image(file, preview));
        }

        Msg::ImageRemoved => revoke_preview(model.form.remove_image()),

        Msg::Submit => match model.form.begin_submit() {
            SubmitOutcome::Busy => {
                orders.skip();
            }
            SubmitOutcome::Invalid(err) => log!("Form rejected:", err.to_string()),
            SubmitOutcome::Ready(submission) => {
                log!("Sending object", submission.title);
                let config = model.config.clone();
                orders.perform_cmd(async move { Msg::Submitted(api::create(config, submission).await) });
            }
        },

        Msg::Submitted(Ok(record)) => match model.form.finish_success(record) {
            Some(done) => {
                revoke_preview(done.released_preview);
                orders.notify(Created(done.created));
            }
            None => {
                orders.skip();
            }
        },

        Msg::Submitted(Err(err)) => {
            error!("Error creating object:", err.to_string());
            model.form.finish_failure(err.backend_message());
        }
    }
}

fn selected_file(event: web_sys::Event) -> Option<web_sys::File> {
    event
        .target()?
        .dyn_into::<web_sys::HtmlInputElement>()
        .ok()?
        .files()?
        .get(0)
}

fn image_input(model: &Model) -> Node<Msg> {
    let busy = model.form.is_submitting();
    match model.form.preview() {
        Some(preview) => div![
            attrs! {At::Class => "position-relative"},
            img![attrs! {
                At::Src => preview,
                At::Alt => "Preview",
                At::Class => "img-fluid rounded border",
            }],
            button![
                attrs! {
                    At::Type => "button",
                    At::Class => "btn btn-danger btn-sm position-absolute",
                    At::Style => "top: .5rem; right: .5rem",
                    At::Disabled => busy.as_at_value(),
                },
                ev(Ev::Click, |_| Msg::ImageRemoved),
                "×"
            ],
        ],
        None => div![
            input![
                attrs! {
                    At::Id => "image",
                    At::Type => "file",
                    At::Accept => "image/*",
                    At::Class => "form-control-file",
                    At::Disabled => busy.as_at_value(),
                },
                ev(Ev::Change, |event| selected_file(event).map(Msg::ImageSelected)),
            ],
            small![
                attrs! {At::Class => "form-text text-muted"},
                "JPEG, PNG, GIF, WebP (max 10MB)"
            ],
        ],
    }
}

pub fn view(model: &Model) -> Node<Msg> {
    let busy = model.form.is_submitting();
    div![
        attrs! {At::Class => "card"},
        div![
            attrs! {At::Class => "card-header"},
            "Create a new object"
        ],
        form![
            attrs! {At::Class => "card-body"},
            ev(Ev::Submit, |event| {
                event.prevent_default();
                Msg::Submit
            }),
            div![
                attrs! {At::Class => "form-group"},
                label![attrs! {At::For => "title"}, "Title *"],
                input![
                    input_ev(Ev::Input, Msg::TitleChanged),
                    attrs! {
                        At::Id => "title",
                        At::Type => "text",
                        At::Class => "form-control",
                        At::Placeholder => "Object title",
                        At::Value => model.form.title,
                        At::Disabled => busy.as_at_value(),
                    },
                ],
            ],
            div![
                attrs! {At::Class => "form-group"},
                label![attrs! {At::For => "description"}, "Description *"],
                textarea![
                    input_ev(Ev::Input, Msg::DescriptionChanged),
                    attrs! {
                        At::Id => "description",
                        At::Class => "form-control",
                        At::Placeholder => "Object description",
                        At::Rows => 4,
                        At::Value => model.form.description,
                        At::Disabled => busy.as_at_value(),
                    },
                ],
            ],
            div![
                attrs! {At::Class => "form-group"},
                label![attrs! {At::For => "image"}, "Image *"],
                image_input(model),
            ],
            if let Some(error) = model.form.error() {
                div![attrs! {At::Class => "alert alert-danger"}, error]
            } else {
                empty![]
            },
            button![
                attrs! {
                    At::Type => "submit",
                    At::Class => "btn btn-primary btn-block",
                    At::Disabled => (!model.form.can_submit()).as_at_value(),
                },
                if busy {
                    vec![
                        span![attrs! {At::Class => "spinner-border spinner-border-sm mr-2"}],
                        Node::new_text("Creating..."),
                    ]
                } else {
                    vec![Node::new_text("Create object")]
                }
            ],
        ],
    ]
}
