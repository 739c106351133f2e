use std::cell::RefCell;
use std::rc::Rc;

use chrono::{TimeDelta, Utc};

use row_panel::controller::{
    ControllerSettings, HistoryState, MemoryHistory, Outcome, PanelController, ToastKind,
};
use row_panel::engine::{Event, ManualEngine, Request};
use row_panel::error::{GatewayError, Rejected};
use row_panel::events::{Interaction, PanelEvent, RowAction};
use row_panel::surface::{MemorySurface, PanelView};
use row_panel::types::{
    Direction, FieldErrors, FormFields, ModeKind, Page, PanelMode, RowId, SubmitOutcome,
};

type Controller = PanelController<MemorySurface, MemoryHistory>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn id(n: u64) -> RowId {
    RowId::new(n).unwrap()
}

fn rows_html(ids: &[u64]) -> String {
    ids.iter()
        .map(|i| format!("<tr data-id=\"{i}\"><td>Row {i}</td></tr>"))
        .collect()
}

fn setup_with(surface: MemorySurface) -> (Controller, ManualEngine) {
    let (handle, engine) = ManualEngine::new();
    let mut controller = PanelController::new(
        handle,
        surface,
        MemoryHistory::new(),
        ControllerSettings::default(),
    );
    controller.init().unwrap();
    (controller, engine)
}

fn setup(ids: &[u64]) -> (Controller, ManualEngine) {
    setup_with(MemorySurface::new(&rows_html(ids)))
}

fn next(engine: &mut ManualEngine) -> Request {
    engine.next_request().expect("a pending request")
}

/// The success reply a well-behaved gateway would send.
fn ok_reply(req: &Request) -> Event {
    match req {
        Request::FetchDetail {
            id: row,
            fingerprint,
            ..
        } => Event::DetailFetched {
            fingerprint: *fingerprint,
            result: Ok(format!("<article data-id=\"{row}\"></article>")),
        },
        Request::FetchForm { fingerprint, .. } => Event::FormFetched {
            fingerprint: *fingerprint,
            result: Ok("<form></form>".to_owned()),
        },
        Request::SubmitForm {
            id: row,
            fingerprint,
            ..
        } => Event::FormSubmitted {
            fingerprint: *fingerprint,
            result: Ok(SubmitOutcome::Saved(row.unwrap_or(id(100)))),
        },
        Request::DeleteRow { id: row, .. } => Event::RowDeleted {
            id: *row,
            result: Ok(()),
        },
        Request::FetchPage { page, .. } => Event::PageFetched {
            page: *page,
            result: Ok(Page {
                html: String::new(),
                has_more: false,
            }),
        },
        Request::Shutdown => panic!("Shutdown has no reply"),
    }
}

/// Answer the oldest pending request with success and apply the reply.
fn answer(controller: &mut Controller, engine: &mut ManualEngine) -> Request {
    let req = next(engine);
    ManualEngine::reply(&req, ok_reply(&req));
    assert_eq!(controller.pump(), 1);
    req
}

fn open_and_load(controller: &mut Controller, engine: &mut ManualEngine, row: u64) {
    assert_eq!(controller.open_detail(id(row)), Ok(Outcome::Requested));
    answer(controller, engine);
    assert_eq!(controller.mode(), PanelMode::Detail(id(row)));
    assert!(!controller.is_loading());
}

fn urls(controller: &Controller) -> Vec<String> {
    controller
        .history()
        .entries()
        .iter()
        .map(|e| e.url.clone())
        .collect()
}

fn record_events(controller: &mut Controller) -> Rc<RefCell<Vec<PanelEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    controller.subscribe(move |e| sink.borrow_mut().push(e.clone()));
    seen
}

// ---------------------------------------------------------------------------
// Loading guard
// ---------------------------------------------------------------------------

#[test]
fn rejected_calls_leave_state_unchanged() {
    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    assert_eq!(controller.open_detail(id(1)), Ok(Outcome::Requested));
    let before = controller.state().clone();

    assert_eq!(controller.open_detail(id(2)), Err(Rejected::Busy));
    assert_eq!(controller.open_form(None), Err(Rejected::Busy));
    assert_eq!(controller.open_form(Some(id(1))), Err(Rejected::Busy));
    assert_eq!(controller.navigate(Direction::Next), Err(Rejected::Busy));
    assert_eq!(
        controller.submit_form(FormFields::new()),
        Err(Rejected::Busy)
    );
    assert_eq!(controller.delete_row(id(2)), Err(Rejected::Busy));

    assert_eq!(controller.state(), &before);
    assert_eq!(engine.drain().len(), 1);
    assert!(controller.surface().confirmations().is_empty());
}

#[test]
fn reopening_the_shown_row_is_a_noop() {
    let (mut controller, mut engine) = setup(&[1, 2]);
    open_and_load(&mut controller, &mut engine, 1);
    assert_eq!(controller.open_detail(id(1)), Ok(Outcome::Noop));
    assert!(engine.next_request().is_none());
}

#[test]
fn close_before_reply_discards_the_stale_response() {
    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    let seen = record_events(&mut controller);

    controller.open_detail(id(1)).unwrap();
    assert_eq!(controller.close(), Ok(Outcome::Applied));
    assert_eq!(controller.mode(), PanelMode::Closed);
    assert_eq!(controller.focused_id(), None);
    assert!(controller.is_loading());

    answer(&mut controller, &mut engine);

    assert_eq!(controller.mode(), PanelMode::Closed);
    assert!(!controller.is_loading());
    assert_eq!(controller.surface().panel(), &PanelView::Hidden);
    assert!(controller.surface().active_rows().is_empty());
    assert!(
        seen.borrow()
            .contains(&PanelEvent::StaleDropped(PanelMode::Detail(id(1))))
    );
    // The detail never showed, so closing adds no entry.
    assert_eq!(urls(&controller), ["/admin/rows"]);
}

#[test]
fn panel_error_renders_inline_and_keeps_the_panel_open() {
    let (mut controller, mut engine) = setup(&[1, 2]);
    controller.open_detail(id(2)).unwrap();
    let req = next(&mut engine);
    let Request::FetchDetail { fingerprint, .. } = req else {
        panic!("expected FetchDetail, got {req:?}");
    };
    let err = GatewayError::Network("connection refused".to_owned());
    ManualEngine::reply(
        &req,
        Event::DetailFetched {
            fingerprint,
            result: Err(err.clone()),
        },
    );
    controller.pump();

    assert_eq!(controller.mode(), PanelMode::Detail(id(2)));
    assert!(!controller.is_loading());
    assert_eq!(controller.surface().panel(), &PanelView::Error(err));
    assert_eq!(urls(&controller), ["/admin/rows"]);

    // Recoverable by close.
    assert_eq!(controller.close(), Ok(Outcome::Applied));
    assert_eq!(controller.surface().panel(), &PanelView::Hidden);
}

#[test]
fn failed_panel_load_can_be_retried() {
    let (mut controller, mut engine) = setup(&[1, 2]);
    controller.open_detail(id(2)).unwrap();
    let req = next(&mut engine);
    ManualEngine::reply(
        &req,
        Event::DetailFetched {
            fingerprint: PanelMode::Detail(id(2)),
            result: Err(GatewayError::Network("timed out".to_owned())),
        },
    );
    controller.pump();
    assert!(controller.state().has_failed());

    // Opening the same row again re-issues the fetch.
    assert_eq!(controller.open_detail(id(2)), Ok(Outcome::Requested));
    assert!(controller.is_loading());
    let req = answer(&mut controller, &mut engine);
    assert!(matches!(req, Request::FetchDetail { id: row, .. } if row == id(2)));

    assert!(!controller.state().has_failed());
    assert!(matches!(controller.surface().panel(), PanelView::Content { .. }));
    assert_eq!(urls(&controller), ["/admin/rows", "/admin/rows/2/"]);

    // Once loaded, reopening is a no-op again.
    assert_eq!(controller.open_detail(id(2)), Ok(Outcome::Noop));
    assert!(engine.next_request().is_none());
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[test]
fn navigate_next_fetches_the_following_row() {
    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    open_and_load(&mut controller, &mut engine, 2);

    assert_eq!(controller.navigate(Direction::Next), Ok(Outcome::Requested));
    let req = answer(&mut controller, &mut engine);
    assert!(matches!(req, Request::FetchDetail { id: row, .. } if row == id(3)));

    assert_eq!(controller.focused_id(), Some(id(3)));
    assert_eq!(controller.surface().active_rows(), vec![id(3)]);
    assert_eq!(
        urls(&controller),
        ["/admin/rows", "/admin/rows/2/", "/admin/rows/3/"]
    );
}

#[test]
fn navigate_at_either_end_is_a_noop() {
    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    open_and_load(&mut controller, &mut engine, 3);
    assert_eq!(controller.navigate(Direction::Next), Ok(Outcome::Noop));
    assert!(engine.next_request().is_none());

    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    open_and_load(&mut controller, &mut engine, 1);
    assert_eq!(controller.navigate(Direction::Prev), Ok(Outcome::Noop));
    assert!(engine.next_request().is_none());
    assert_eq!(controller.mode(), PanelMode::Detail(id(1)));
}

#[test]
fn navigate_keeps_form_mode() {
    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    controller.open_form(Some(id(2))).unwrap();
    answer(&mut controller, &mut engine);

    controller.navigate(Direction::Prev).unwrap();
    let req = next(&mut engine);
    assert!(matches!(
        req,
        Request::FetchForm { id: Some(row), .. } if row == id(1)
    ));
}

#[test]
fn navigate_needs_an_open_panel() {
    let (mut controller, _engine) = setup(&[1, 2]);
    assert_eq!(controller.navigate(Direction::Next), Err(Rejected::NotOpen));
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn deleting_the_focused_row_closes_the_panel() {
    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    open_and_load(&mut controller, &mut engine, 2);

    assert_eq!(controller.delete_row(id(2)), Ok(Outcome::Requested));
    assert_eq!(
        controller.surface().confirmations(),
        ["Delete row 2? This cannot be undone."]
    );
    assert!(controller.is_loading());
    answer(&mut controller, &mut engine);

    assert_eq!(controller.rows().as_slice(), [id(1), id(3)]);
    assert_eq!(controller.mode(), PanelMode::Closed);
    assert!(!controller.is_loading());
    assert_eq!(controller.surface().row_count(), 2);
    assert_eq!(controller.toasts().len(), 1);
    assert_eq!(controller.toasts()[0].kind, ToastKind::Success);
}

#[test]
fn deleting_another_row_keeps_the_panel_open() {
    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    open_and_load(&mut controller, &mut engine, 1);

    controller.delete_row(id(3)).unwrap();
    answer(&mut controller, &mut engine);

    assert_eq!(controller.rows().as_slice(), [id(1), id(2)]);
    assert_eq!(controller.mode(), PanelMode::Detail(id(1)));
}

#[test]
fn declined_confirmation_sends_nothing() {
    let (mut controller, mut engine) = setup(&[1, 2]);
    controller.surface_mut().set_confirm_answer(false);

    assert_eq!(controller.delete_row(id(2)), Err(Rejected::NotConfirmed(id(2))));
    assert!(engine.next_request().is_none());
    assert!(!controller.is_loading());
}

#[test]
fn unknown_row_is_never_confirmed() {
    let (mut controller, _engine) = setup(&[1, 2]);
    assert_eq!(controller.delete_row(id(9)), Err(Rejected::UnknownRow(id(9))));
    assert!(controller.surface().confirmations().is_empty());
}

#[test]
fn failed_delete_toasts_and_keeps_the_row() {
    let (mut controller, mut engine) = setup(&[1, 2]);
    controller.delete_row(id(2)).unwrap();
    let req = next(&mut engine);
    ManualEngine::reply(
        &req,
        Event::RowDeleted {
            id: id(2),
            result: Err(GatewayError::Server("row is locked".to_owned())),
        },
    );
    controller.pump();

    assert_eq!(controller.rows().len(), 2);
    assert!(!controller.is_loading());
    let toast = &controller.surface().toasts()[0];
    assert_eq!(toast.kind, ToastKind::Error);
    assert_eq!(toast.message, "row is locked");
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[test]
fn validation_errors_keep_the_form_open() {
    let (mut controller, mut engine) = setup(&[1, 2]);
    controller.open_form(Some(id(2))).unwrap();
    answer(&mut controller, &mut engine);

    let mut fields = FormFields::new();
    fields.insert("title".into(), String::new());
    assert_eq!(controller.submit_form(fields), Ok(Outcome::Requested));
    assert!(!controller.surface().form_enabled());

    let req = next(&mut engine);
    let mut errors = FieldErrors::new();
    errors.insert("title".into(), "This field is required.".into());
    ManualEngine::reply(
        &req,
        Event::FormSubmitted {
            fingerprint: PanelMode::Form(Some(id(2))),
            result: Ok(SubmitOutcome::Invalid(errors.clone())),
        },
    );
    controller.pump();

    assert_eq!(controller.mode(), PanelMode::Form(Some(id(2))));
    assert!(!controller.is_loading());
    assert_eq!(controller.surface().field_errors(), &errors);
    assert!(controller.surface().form_enabled());
    assert!(matches!(
        controller.surface().panel(),
        PanelView::Content { .. }
    ));
}

#[test]
fn saved_create_form_opens_the_new_row() {
    let (mut controller, mut engine) = setup(&[1]);
    controller.open_form(None).unwrap();
    answer(&mut controller, &mut engine);
    assert_eq!(urls(&controller), ["/admin/rows", "/admin/rows/create"]);

    controller.submit_form(FormFields::new()).unwrap();
    answer(&mut controller, &mut engine);

    assert_eq!(controller.mode(), PanelMode::Detail(id(100)));
    assert!(controller.is_loading());
    assert_eq!(controller.toasts()[0].kind, ToastKind::Success);
    answer(&mut controller, &mut engine);
    assert_eq!(
        urls(&controller).last().map(String::as_str),
        Some("/admin/rows/100/")
    );
}

#[test]
fn failed_submit_toasts_and_reenables_the_form() {
    let (mut controller, mut engine) = setup(&[1]);
    controller.open_form(Some(id(1))).unwrap();
    answer(&mut controller, &mut engine);

    controller.submit_form(FormFields::new()).unwrap();
    let req = next(&mut engine);
    ManualEngine::reply(
        &req,
        Event::FormSubmitted {
            fingerprint: PanelMode::Form(Some(id(1))),
            result: Err(GatewayError::Network("timed out".to_owned())),
        },
    );
    controller.pump();

    assert_eq!(controller.mode(), PanelMode::Form(Some(id(1))));
    assert!(controller.surface().form_enabled());
    assert_eq!(controller.toasts()[0].message, "network error: timed out");
}

#[test]
fn submit_needs_an_open_form() {
    let (mut controller, mut engine) = setup(&[1]);
    open_and_load(&mut controller, &mut engine, 1);
    assert_eq!(
        controller.submit_form(FormFields::new()),
        Err(Rejected::NoForm)
    );
}

// ---------------------------------------------------------------------------
// Infinite scroll
// ---------------------------------------------------------------------------

#[test]
fn double_intersection_fetches_page_two_once() {
    let (mut controller, mut engine) =
        setup_with(MemorySurface::new(&rows_html(&[1, 2, 3])).with_has_more(true));

    assert_eq!(controller.on_sentinel_visible(), Outcome::Requested);
    assert_eq!(controller.on_sentinel_visible(), Outcome::Noop);

    let requests = engine.drain();
    assert_eq!(requests.len(), 1);
    let Request::FetchPage { page, .. } = &requests[0] else {
        panic!("expected FetchPage, got {:?}", requests[0]);
    };
    assert_eq!(*page, 2);

    ManualEngine::reply(
        &requests[0],
        Event::PageFetched {
            page: 2,
            result: Ok(Page {
                html: rows_html(&[4, 5]),
                has_more: true,
            }),
        },
    );
    controller.pump();

    assert_eq!(controller.rows().len(), 5);
    assert_eq!(controller.cursor().page(), 2);
    assert!(controller.cursor().has_more());

    controller.on_sentinel_visible();
    assert!(matches!(
        next(&mut engine),
        Request::FetchPage { page: 3, .. }
    ));
}

#[test]
fn failed_page_is_retried_on_the_next_intersection() {
    let (mut controller, mut engine) =
        setup_with(MemorySurface::new(&rows_html(&[1])).with_has_more(true));
    controller.on_sentinel_visible();
    let req = next(&mut engine);
    ManualEngine::reply(
        &req,
        Event::PageFetched {
            page: 2,
            result: Err(GatewayError::Network("reset".to_owned())),
        },
    );
    controller.pump();

    assert_eq!(controller.cursor().page(), 1);
    assert!(controller.cursor().has_more());
    assert!(controller.toasts().is_empty());

    controller.on_sentinel_visible();
    assert!(matches!(
        next(&mut engine),
        Request::FetchPage { page: 2, .. }
    ));
}

#[test]
fn exhausted_list_stops_fetching() {
    let (mut controller, mut engine) = setup(&[1, 2]);
    assert_eq!(controller.on_sentinel_visible(), Outcome::Noop);
    assert!(engine.next_request().is_none());
}

#[test]
fn scrolling_runs_alongside_a_panel_load() {
    let (mut controller, mut engine) =
        setup_with(MemorySurface::new(&rows_html(&[1, 2, 3])).with_has_more(true));
    controller.open_detail(id(3)).unwrap();
    assert_eq!(controller.on_sentinel_visible(), Outcome::Requested);
    assert_eq!(engine.drain().len(), 2);
    assert!(controller.is_loading());
    assert!(controller.cursor().is_loading());
}

#[test]
fn appended_page_extends_navigation() {
    let (mut controller, mut engine) =
        setup_with(MemorySurface::new(&rows_html(&[1, 2])).with_has_more(true));
    open_and_load(&mut controller, &mut engine, 2);
    assert_eq!(controller.navigate(Direction::Next), Ok(Outcome::Noop));

    controller.on_sentinel_visible();
    let req = next(&mut engine);
    ManualEngine::reply(
        &req,
        Event::PageFetched {
            page: 2,
            result: Ok(Page {
                html: rows_html(&[3]),
                has_more: false,
            }),
        },
    );
    controller.pump();

    assert_eq!(controller.navigate(Direction::Next), Ok(Outcome::Requested));
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[test]
fn back_and_forward_replay_without_growing_history() {
    let (mut controller, mut engine) = setup(&[41, 42]);
    open_and_load(&mut controller, &mut engine, 42);
    assert_eq!(urls(&controller), ["/admin/rows", "/admin/rows/42/"]);

    let payload = controller.history_mut().back().unwrap();
    assert_eq!(controller.on_history_pop(payload), Ok(Outcome::Applied));
    assert_eq!(controller.mode(), PanelMode::Closed);

    let payload = controller.history_mut().forward().unwrap();
    assert_eq!(controller.on_history_pop(payload), Ok(Outcome::Requested));
    answer(&mut controller, &mut engine);

    assert_eq!(controller.mode(), PanelMode::Detail(id(42)));
    assert_eq!(controller.history().len(), 2);
}

#[test]
fn replaying_the_current_state_fetches_nothing() {
    let (mut controller, mut engine) = setup(&[42]);
    open_and_load(&mut controller, &mut engine, 42);

    let payload = HistoryState {
        focused_id: Some(id(42)),
        mode: ModeKind::Detail,
    };
    assert_eq!(controller.on_history_pop(payload), Ok(Outcome::Noop));
    assert!(engine.next_request().is_none());
    assert_eq!(controller.mode(), PanelMode::Detail(id(42)));
}

#[test]
fn history_pop_mid_load_is_rejected() {
    let (mut controller, mut engine) = setup(&[1, 2]);
    controller.open_detail(id(1)).unwrap();

    let payload = HistoryState::from_mode(PanelMode::Detail(id(2)));
    assert_eq!(controller.on_history_pop(payload), Err(Rejected::Busy));
    assert_eq!(controller.mode(), PanelMode::Detail(id(1)));
    assert_eq!(engine.drain().len(), 1);
}

#[test]
fn failed_back_load_keeps_the_address_bar_in_step() {
    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    open_and_load(&mut controller, &mut engine, 1);
    open_and_load(&mut controller, &mut engine, 2);

    let payload = controller.history_mut().back().unwrap();
    assert_eq!(controller.on_history_pop(payload), Ok(Outcome::Requested));
    let req = next(&mut engine);
    ManualEngine::reply(
        &req,
        Event::DetailFetched {
            fingerprint: PanelMode::Detail(id(1)),
            result: Err(GatewayError::Server("gone".to_owned())),
        },
    );
    controller.pump();
    assert_eq!(controller.mode(), PanelMode::Detail(id(1)));

    assert_eq!(controller.navigate(Direction::Next), Ok(Outcome::Requested));
    answer(&mut controller, &mut engine);

    assert_eq!(controller.mode(), PanelMode::Detail(id(2)));
    assert_eq!(
        controller.history().current().map(|e| e.url.as_str()),
        Some("/admin/rows/2/")
    );
}

#[test]
fn malformed_history_payload_is_ignored() {
    let (mut controller, _engine) = setup(&[1]);
    let payload = HistoryState {
        focused_id: None,
        mode: ModeKind::Detail,
    };
    assert_eq!(controller.on_history_pop(payload), Ok(Outcome::Noop));
}

#[test]
fn init_rehydrates_an_open_panel_with_replace() {
    let surface =
        MemorySurface::new(&rows_html(&[1, 2, 3])).with_initial_mode(PanelMode::Form(Some(id(2))));
    let (mut controller, mut engine) = setup_with(surface);

    assert!(controller.is_loading());
    answer(&mut controller, &mut engine);

    assert_eq!(controller.mode(), PanelMode::Form(Some(id(2))));
    assert_eq!(urls(&controller), ["/admin/rows/2/edit"]);
    assert_eq!(controller.surface().active_rows(), vec![id(2)]);
}

// ---------------------------------------------------------------------------
// Keyboard
// ---------------------------------------------------------------------------

#[test]
fn arrow_keys_navigate_only_in_detail_without_text_focus() {
    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    open_and_load(&mut controller, &mut engine, 1);

    controller.surface_mut().set_text_input_focused(true);
    assert_eq!(controller.handle_key("down"), Ok(Outcome::Noop));
    assert_eq!(controller.handle_key("j"), Ok(Outcome::Noop));

    controller.surface_mut().set_text_input_focused(false);
    assert_eq!(controller.handle_key("j"), Ok(Outcome::Requested));
    answer(&mut controller, &mut engine);
    assert_eq!(controller.focused_id(), Some(id(2)));
}

#[test]
fn arrow_keys_do_nothing_in_form_mode() {
    let (mut controller, mut engine) = setup(&[1, 2, 3]);
    controller.open_form(Some(id(1))).unwrap();
    answer(&mut controller, &mut engine);
    assert_eq!(controller.handle_key("down"), Ok(Outcome::Noop));
    assert!(engine.next_request().is_none());
}

#[test]
fn escape_closes_even_while_typing() {
    let (mut controller, mut engine) = setup(&[1]);
    controller.open_form(Some(id(1))).unwrap();
    answer(&mut controller, &mut engine);

    controller.surface_mut().set_text_input_focused(true);
    assert_eq!(controller.handle_key("esc"), Ok(Outcome::Applied));
    assert_eq!(controller.mode(), PanelMode::Closed);
    assert_eq!(controller.handle_key("esc"), Ok(Outcome::Noop));
}

#[test]
fn new_and_edit_shortcuts_open_forms() {
    let (mut controller, mut engine) = setup(&[1]);
    assert_eq!(controller.handle_key("n"), Ok(Outcome::Requested));
    answer(&mut controller, &mut engine);
    assert_eq!(controller.mode(), PanelMode::Form(None));

    controller.close().unwrap();
    open_and_load(&mut controller, &mut engine, 1);
    assert_eq!(controller.handle_key("e"), Ok(Outcome::Requested));
    assert_eq!(controller.mode(), PanelMode::Form(Some(id(1))));
}

// ---------------------------------------------------------------------------
// Row UI, events, toasts, teardown
// ---------------------------------------------------------------------------

#[test]
fn row_menus_close_on_outside_click() {
    let (mut controller, _engine) = setup(&[1, 2]);
    let menu = |row| Interaction::ActionInvoked {
        action: RowAction::ToggleMenu,
        id: RowId::new(row).unwrap(),
    };

    controller.dispatch(menu(1)).unwrap();
    controller.dispatch(menu(2)).unwrap();
    assert_eq!(controller.surface().open_menus(), vec![id(2)]);

    assert_eq!(
        controller.dispatch(Interaction::OutsideClicked),
        Ok(Outcome::Applied)
    );
    assert!(controller.surface().open_menus().is_empty());
    assert_eq!(
        controller.dispatch(Interaction::OutsideClicked),
        Ok(Outcome::Noop)
    );
}

#[test]
fn subscribers_see_interactions_before_state_changes() {
    let (mut controller, _engine) = setup(&[1]);
    let seen = record_events(&mut controller);

    controller
        .dispatch(Interaction::RowClicked(id(1)))
        .unwrap();

    assert_eq!(
        *seen.borrow(),
        [
            PanelEvent::Interaction(Interaction::RowClicked(id(1))),
            PanelEvent::StateChanged {
                mode: PanelMode::Detail(id(1)),
                loading: true,
            },
        ]
    );
}

#[test]
fn rejections_are_published() {
    let (mut controller, _engine) = setup(&[1, 2]);
    controller.open_detail(id(1)).unwrap();
    let seen = record_events(&mut controller);

    let _ = controller.open_detail(id(2));
    assert_eq!(*seen.borrow(), [PanelEvent::Rejected(Rejected::Busy)]);
}

#[test]
fn toasts_dismiss_themselves() {
    let (mut controller, mut engine) = setup(&[1, 2]);
    controller.delete_row(id(2)).unwrap();
    answer(&mut controller, &mut engine);
    assert_eq!(controller.surface().toasts().len(), 1);

    assert_eq!(controller.tick(Utc::now()), 0);
    assert_eq!(controller.tick(Utc::now() + TimeDelta::seconds(5)), 1);
    assert!(controller.surface().toasts().is_empty());
}

#[test]
fn teardown_drops_subscribers_and_stops_the_engine() {
    let (mut controller, mut engine) = setup(&[1]);
    let seen = record_events(&mut controller);

    controller.teardown();
    let _ = controller.open_detail(id(1));

    assert!(seen.borrow().is_empty());
    assert!(matches!(engine.next_request(), Some(Request::Shutdown)));
}
