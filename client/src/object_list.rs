use crate::api::{self, ApiError};
use crate::push_channel::{self, PushChannel};
use seed::{self, prelude::*, *};
use shared::images::{ImageAllowList, PLACEHOLDER_IMAGE};
use shared::push::PushEvent;
use shared::catalog::SnapshotMark;
use shared::{AppConfig, Record, RecordSet};
use std::collections::HashSet;
use std::rc::Rc;

/// How long a successful delete request waits for its `object:deleted` event
/// before the list is re-fetched.
pub const DELETE_CONFIRM_TIMEOUT_MS: u32 = 15_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Grid,
    List,
}

impl Default for ViewMode {
    fn default() -> Self {
        ViewMode::Grid
    }
}

pub struct Model {
    config: Rc<AppConfig>,
    images: ImageAllowList,
    records: RecordSet,
    loading: bool,
    broken_images: HashSet<String>,
    error: Option<String>,
    // dropped together with the model, which closes the socket
    push: Option<PushChannel>,
}

pub enum Msg {
    Fetched(SnapshotMark, Vec<Record>),
    Refetched(SnapshotMark, Vec<Record>),
    Push(push_channel::Msg),
    DeleteRequested(String),
    Deleted(String, Result<(), ApiError>),
    DeleteUnconfirmed(String),
    ImageFailed(String),
    DismissError,
}

pub fn init(config: Rc<AppConfig>, orders: &mut impl Orders<Msg>) -> Model {
    let images = config.image_allow_list().unwrap_or_else(|err| {
        error!("Image allow-list rejected, images disabled:", err.to_string());
        ImageAllowList::default()
    });

    let records = RecordSet::new();
    orders.perform_cmd({
        let config = config.clone();
        let mark = records.mark();
        async move { Msg::Fetched(mark, api::list_all(config).await) }
    });
    let push = PushChannel::open(&config.api_url, &mut orders.proxy(Msg::Push));

    Model {
        config,
        images,
        records,
        loading: true,
        broken_images: HashSet::new(),
        error: None,
        push,
    }
}

impl Model {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_live(&self) -> bool {
        self.push.as_ref().map_or(false, PushChannel::is_live)
    }
}

pub fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::Fetched(mark, records) => {
            model.records.apply_snapshot(mark, records);
            model.loading = false;
        }

        Msg::Refetched(mark, records) => {
            model.records.apply_snapshot(mark, records);
        }

        Msg::Push(msg) => {
            let event = match model.push.as_mut() {
                Some(channel) => push_channel::update(msg, channel, &mut orders.proxy(Msg::Push)),
                None => None,
            };
            match event {
                Some(PushEvent::Created(record)) => {
                    model.records.apply_created(record);
                }
                Some(PushEvent::Deleted { id }) => {
                    model.records.apply_deleted(&id);
                    model.broken_images.remove(&id);
                }
                None => {
                    orders.skip();
                }
            }
        }

        Msg::DeleteRequested(id) => {
            if !model.records.begin_delete(&id) {
                orders.skip();
                return;
            }
            log!("Deleting object", id);
            let config = model.config.clone();
            orders.perform_cmd(async move {
                let result = api::delete(config, id.clone()).await;
                Msg::Deleted(id, result)
            });
        }

        // the item only disappears once the push channel confirms the delete
        Msg::Deleted(id, Ok(())) => {
            log!("Delete request accepted for", id);
            orders.perform_cmd(cmds::timeout(DELETE_CONFIRM_TIMEOUT_MS, move || {
                Msg::DeleteUnconfirmed(id)
            }));
        }

        Msg::Deleted(id, Err(err)) => {
            error!("Delete failed:", id, err.to_string());
            model.records.delete_failed(&id);
            model.error = Some(format!(
                "Failed to delete the object: {}",
                err.backend_message().unwrap_or_else(|| err.to_string())
            ));
        }

        Msg::DeleteUnconfirmed(id) => {
            if model.records.delete_unconfirmed(&id) {
                log!("No delete confirmation for", id, "- reloading objects");
                let config = model.config.clone();
                let mark = model.records.mark();
                orders.perform_cmd(async move { Msg::Refetched(mark, api::list_all(config).await) });
            } else {
                orders.skip();
            }
        }

        Msg::ImageFailed(id) => {
            model.broken_images.insert(id);
        }

        Msg::DismissError => {
            model.error = None;
        }
    }
}

fn confirm_delete() -> bool {
    web_sys::window()
        .and_then(|window| {
            window
                .confirm_with_message("Are you sure you want to delete this object?")
                .ok()
        })
        .unwrap_or(false)
}

fn image_src<'a>(model: &Model, record: &'a Record) -> &'a str {
    if model.broken_images.contains(&record.id) {
        PLACEHOLDER_IMAGE
    } else {
        model.images.resolve(&record.image_url)
    }
}

fn image(model: &Model, record: &Record, class: &str) -> Node<Msg> {
    let id = record.id.clone();
    img![
        attrs! {
            At::Class => class,
            At::Src => image_src(model, record),
            At::Alt => &record.title,
            At::from("loading") => "lazy",
        },
        ev(Ev::Error, move |_| Msg::ImageFailed(id)),
    ]
}

fn delete_button(model: &Model, record: &Record, label: &str) -> Node<Msg> {
    let id = record.id.clone();
    let deleting = model.records.is_deleting(&record.id);
    button![
        attrs! {
            At::Class => "btn btn-danger btn-sm",
            At::Disabled => deleting.as_at_value(),
        },
        ev(Ev::Click, move |_| {
            if confirm_delete() {
                Some(Msg::DeleteRequested(id))
            } else {
                None
            }
        }),
        if deleting {
            vec![
                span![attrs! {At::Class => "spinner-border spinner-border-sm mr-1"}],
                Node::new_text("Deleting..."),
            ]
        } else {
            vec![Node::new_text(label.to_string())]
        }
    ]
}

fn grid_card(model: &Model, record: &Record) -> Node<Msg> {
    div![
        attrs! {At::Class => "col-sm-6 col-lg-4 mb-3"},
        div![
            attrs! {At::Class => "card h-100"},
            image(model, record, "card-img-top"),
            div![
                attrs! {At::Class => "card-body"},
                h5![attrs! {At::Class => "card-title"}, record.title.as_str()],
                p![attrs! {At::Class => "card-text"}, record.description.as_str()],
            ],
            div![
                attrs! {At::Class => "card-footer d-flex justify-content-between align-items-center"},
                small![attrs! {At::Class => "text-muted"}, record.display_date()],
                delete_button(model, record, "Delete"),
            ],
        ],
    ]
}

fn list_row(model: &Model, record: &Record) -> Node<Msg> {
    li![
        attrs! {At::Class => "list-group-item d-flex align-items-start"},
        image(model, record, "rounded mr-3"),
        div![
            attrs! {At::Class => "flex-grow-1"},
            h6![attrs! {At::Class => "mb-1"}, record.title.as_str()],
            p![attrs! {At::Class => "mb-1"}, record.description.as_str()],
            small![attrs! {At::Class => "text-muted"}, record.display_date()],
        ],
        delete_button(model, record, "Delete"),
    ]
}

pub fn view(model: &Model, mode: ViewMode) -> Vec<Node<Msg>> {
    if model.loading {
        return nodes![div![
            attrs! {At::Class => "text-center my-5"},
            div![
                attrs![At::Class => "spinner-border text-secondary"],
                span![attrs![At::Class => "sr-only"], "Loading..."],
            ],
        ]];
    }

    nodes![
        if let Some(error) = &model.error {
            div![
                attrs! {At::Class => "alert alert-danger d-flex justify-content-between"},
                span![error.as_str()],
                button![
                    attrs! {At::Class => "close", At::Type => "button"},
                    ev(Ev::Click, |_| Msg::DismissError),
                    "×"
                ],
            ]
        } else {
            empty![]
        },
        if model.records.is_empty() {
            div![
                attrs! {At::Class => "text-center text-muted my-5"},
                p!["No objects yet"],
                small!["Create the first one with the form."],
            ]
        } else {
            match mode {
                ViewMode::Grid => div![
                    attrs! {At::Class => "row"},
                    model
                        .records
                        .records()
                        .iter()
                        .map(|record| grid_card(model, record)),
                ],
                ViewMode::List => ul![
                    attrs! {At::Class => "list-group"},
                    model
                        .records
                        .records()
                        .iter()
                        .map(|record| list_row(model, record)),
                ],
            }
        },
    ]
}
