use seed::{prelude::*, *};
use shared::health::{ApiStatus, HEALTH_POLL_INTERVAL_MS};
use shared::{AppConfig, Record};
use std::rc::Rc;

mod api;
mod object_form;
mod object_list;
mod push_channel;

use object_list::ViewMode;

const WIDE_SCREEN_PX: f64 = 1024.0;

// ------ ------
//     Init
// ------ ------

fn init(_: Url, orders: &mut impl Orders<Msg>) -> Model {
    orders
        .subscribe(|object_form::Created(record)| Msg::ObjectCreated(record))
        .perform_cmd(async { Msg::ConfigLoaded(api::load_config().await) });
    Model::default()
}

// ------ ------
//     Model
// ------ ------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MobileView {
    List,
    Create,
}

impl Default for MobileView {
    fn default() -> Self {
        MobileView::List
    }
}

/// Everything that needs the configuration to exist.
struct Catalog {
    config: Rc<AppConfig>,
    object_form: object_form::Model,
    object_list: object_list::Model,
    _health_poll: StreamHandle,
}

#[derive(Default)]
struct Model {
    catalog: Option<Catalog>,
    api_status: ApiStatus,
    health_in_flight: bool,
    view_mode: ViewMode,
    mobile_view: MobileView,
}

// ------ ------
//    Update
// ------ ------

enum Msg {
    ConfigLoaded(AppConfig),
    CheckHealth,
    HealthChecked(ApiStatus),
    ObjectCreated(Record),
    SetViewMode(ViewMode),
    SetMobileView(MobileView),
    ObjectForm(object_form::Msg),
    ObjectList(object_list::Msg),
}

fn is_narrow_screen() -> bool {
    web_sys::window()
        .and_then(|window| window.inner_width().ok())
        .and_then(|width| width.as_f64())
        .map_or(false, |width| width < WIDE_SCREEN_PX)
}

fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::ConfigLoaded(config) => {
            log!("Using API at", config.api_url);
            let config = Rc::new(config);
            let object_list = object_list::init(config.clone(), &mut orders.proxy(Msg::ObjectList));
            let health_poll = orders
                .stream_with_handle(streams::interval(HEALTH_POLL_INTERVAL_MS, || Msg::CheckHealth));
            model.catalog = Some(Catalog {
                object_form: object_form::init(config.clone()),
                object_list,
                _health_poll: health_poll,
                config,
            });
            orders.send_msg(Msg::CheckHealth);
        }

        Msg::CheckHealth => {
            let catalog = match &model.catalog {
                Some(catalog) if !model.health_in_flight => catalog,
                _ => {
                    orders.skip();
                    return;
                }
            };
            model.health_in_flight = true;
            model.api_status = ApiStatus::Checking;
            let config = catalog.config.clone();
            orders.perform_cmd(async move { Msg::HealthChecked(api::check_health(config).await) });
        }

        Msg::HealthChecked(status) => {
            log!("API status:", status.to_string());
            model.health_in_flight = false;
            model.api_status = status;
        }

        // remounting the list drops its push channel and fetches a fresh snapshot
        Msg::ObjectCreated(record) => {
            log!("Object created, refreshing list:", record.id);
            if let Some(catalog) = &mut model.catalog {
                catalog.object_list =
                    object_list::init(catalog.config.clone(), &mut orders.proxy(Msg::ObjectList));
            }
            if is_narrow_screen() {
                model.mobile_view = MobileView::List;
            }
        }

        Msg::SetViewMode(mode) => model.view_mode = mode,

        Msg::SetMobileView(view) => model.mobile_view = view,

        Msg::ObjectForm(msg) => {
            if let Some(catalog) = &mut model.catalog {
                object_form::update(msg, &mut catalog.object_form, &mut orders.proxy(Msg::ObjectForm));
            }
        }

        Msg::ObjectList(msg) => {
            if let Some(catalog) = &mut model.catalog {
                object_list::update(msg, &mut catalog.object_list, &mut orders.proxy(Msg::ObjectList));
            }
        }
    }
}

// ------ ------
//     View
// ------ ------

fn status_banner(model: &Model) -> Vec<Node<Msg>> {
    let badge = match model.api_status {
        ApiStatus::Online(_) => "badge badge-success",
        ApiStatus::Offline(_) => "badge badge-danger",
        ApiStatus::Checking => "badge badge-secondary",
    };
    let live = model
        .catalog
        .as_ref()
        .map_or(false, |catalog| catalog.object_list.is_live());

    nodes![
        nav![
            attrs! {At::Class => "navbar navbar-light bg-white border rounded-top mt-1"},
            a!["Object Manager", attrs! {At::Class => "navbar-brand"}],
            div![
                span![attrs! {At::Class => badge}, model.api_status.to_string()],
                if live {
                    span![attrs! {At::Class => "badge badge-info ml-1"}, "Live"]
                } else {
                    empty![]
                },
                button![
                    attrs! {
                        At::Class => "btn btn-outline-secondary btn-sm ml-2",
                        At::Disabled => model.api_status.is_checking().as_at_value(),
                    },
                    ev(Ev::Click, |_| Msg::CheckHealth),
                    "Refresh"
                ],
            ],
        ],
        if let Some(message) = model.api_status.message() {
            small![attrs! {At::Class => "d-block text-muted px-2"}, message]
        } else {
            empty![]
        },
        if let ApiStatus::Offline(_) = model.api_status {
            div![
                attrs! {At::Class => "alert alert-warning mt-2"},
                p!["The API cannot be reached. Check that the backend is running."],
                button![
                    attrs! {At::Class => "btn btn-outline-dark btn-sm"},
                    ev(Ev::Click, |_| Msg::CheckHealth),
                    "Retry connection"
                ],
            ]
        } else {
            empty![]
        },
    ]
}

fn tab(label: String, active: bool, on_click: impl FnOnce() -> Msg + Clone + 'static) -> Node<Msg> {
    let class = if active {
        "btn btn-secondary"
    } else {
        "btn btn-outline-secondary"
    };
    button![attrs! {At::Class => class}, ev(Ev::Click, move |_| on_click()), label]
}

fn mobile_switch(model: &Model, count: usize) -> Node<Msg> {
    div![
        attrs! {At::Class => "btn-group btn-block d-lg-none my-2"},
        tab(
            format!("List ({})", count),
            model.mobile_view == MobileView::List,
            || Msg::SetMobileView(MobileView::List)
        ),
        tab(
            "Create".to_string(),
            model.mobile_view == MobileView::Create,
            || Msg::SetMobileView(MobileView::Create)
        ),
    ]
}

fn view_mode_switch(model: &Model) -> Node<Msg> {
    div![
        attrs! {At::Class => "btn-group btn-group-sm mb-2"},
        tab(
            "Grid".to_string(),
            model.view_mode == ViewMode::Grid,
            || Msg::SetViewMode(ViewMode::Grid)
        ),
        tab(
            "List".to_string(),
            model.view_mode == ViewMode::List,
            || Msg::SetViewMode(ViewMode::List)
        ),
    ]
}

fn catalog_view(model: &Model, catalog: &Catalog) -> Node<Msg> {
    let hidden_on_mobile = |view: MobileView| {
        if model.mobile_view == view {
            ""
        } else {
            " d-none d-lg-block"
        }
    };

    div![
        mobile_switch(model, catalog.object_list.len()),
        div![
            attrs! {At::Class => "row mt-2"},
            div![
                attrs! {At::Class => format!("col-lg-4{}", hidden_on_mobile(MobileView::Create))},
                object_form::view(&catalog.object_form).map_msg(Msg::ObjectForm),
            ],
            div![
                attrs! {At::Class => format!("col-lg-8{}", hidden_on_mobile(MobileView::List))},
                view_mode_switch(model),
                object_list::view(&catalog.object_list, model.view_mode).map_msg(Msg::ObjectList),
            ],
        ],
    ]
}

fn view(model: &Model) -> impl IntoNodes<Msg> {
    div![
        style! {
            St::FontFamily => "sans-serif";
            St::MaxWidth => px(1140);
            St::Margin => "auto";
        },
        status_banner(model),
        match &model.catalog {
            Some(catalog) => catalog_view(model, catalog),
            None => div![
                attrs![At::Class => "spinner-border text-secondary"],
                span![attrs![At::Class => "sr-only"], "Loading..."],
            ],
        },
    ]
}

// ------ ------
//     Start
// ------ ------

#[wasm_bindgen(start)]
pub fn start() {
    App::start("app", init, update, view);
}
