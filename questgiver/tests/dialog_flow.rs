use std::cell::RefCell;
use std::rc::Rc;

use questgiver::dialog::CONTINUE_OPTION_ID;
use questgiver::host::memory::{MemoryHost, RecordingSurface};
use questgiver::host::{DurableStore, PresentationSurface, Services};
use questgiver::*;
use questgiver_data::{CreatorKey, Image, PageId, Shortcut};

struct Harness {
    host: MemoryHost,
    services: Services,
    surface: Rc<RefCell<RecordingSurface>>,
}

impl Harness {
    fn new() -> Harness {
        let host = MemoryHost::new();
        let services = host.services(QuestgiverConfig::default());
        Harness {
            host,
            services,
            surface: Rc::new(RefCell::new(RecordingSurface::default())),
        }
    }

    fn open<S>(&self, dialog: Dialog<S>, state: S) -> DialogSession<S> {
        let surface: Rc<RefCell<dyn PresentationSurface>> = self.surface.clone();
        DialogSession::open(dialog, state, surface, &self.services).expect("dialog opens")
    }

    fn option_ids(&self) -> Vec<String> {
        self.surface.borrow().option_ids().into_iter().map(String::from).collect()
    }

    fn paragraphs(&self) -> Vec<String> {
        self.surface.borrow().paragraph_texts().into_iter().map(String::from).collect()
    }
}

fn say(text: &'static str) -> impl Fn(&mut PageNavigator<()>) -> Result<(), DialogError> {
    move |nav| {
        nav.para(text);
        Ok(())
    }
}

#[test]
fn opening_shows_first_page_with_image_and_options() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![
        Page::new("intro")
            .with_image(Image::portrait("characters", "riley"))
            .on_shown(say("Hello."))
            .with_option(DialogOption::new("Hi", say("Hi.")).with_id("hi").with_shortcut(Shortcut::key('h'))),
        Page::new("other").with_option(DialogOption::new("Other", say("...")).with_id("other")),
    ])
    .expect("unique ids");
    let session = h.open(dialog, ());
    assert_eq!(session.navigator().current_page_id(), Some(&PageId::from("intro")));
    assert_eq!(h.option_ids(), vec!["hi".to_string()]);
    assert_eq!(h.paragraphs(), vec!["Hello.".to_string()]);
    let surface = h.surface.borrow();
    assert_eq!(surface.images.len(), 1);
    assert_eq!(surface.shortcuts, vec![("hi".to_string(), Shortcut::key('h'))]);
}

#[test]
fn navigation_inside_a_shown_callback_wins_and_renders_once() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![
        Page::new("first")
            .on_shown(|nav| nav.go_to_page("second"))
            .with_option(DialogOption::new("Stale", say("")).with_id("stale")),
        Page::new("second").with_option(DialogOption::new("Fresh", say("")).with_id("fresh")),
    ])
    .expect("unique ids");
    let session = h.open(dialog, ());
    assert_eq!(session.navigator().current_page_id(), Some(&PageId::from("second")));
    assert_eq!(h.option_ids(), vec!["fresh".to_string()]);
}

#[test]
fn go_to_missing_page_lists_known_pages() {
    let h = Harness::new();
    let dialog = Dialog::<()>::new(vec![Page::new("intro"), Page::new(2)]).expect("unique ids");
    let mut session = h.open(dialog, ());
    match session.navigator_mut().go_to_page("nowhere") {
        Err(DialogError::NoSuchPage { requested, known }) => {
            assert_eq!(requested, "nowhere");
            assert_eq!(known, vec!["intro".to_string(), "2".to_string()]);
        },
        other => panic!("expected NoSuchPage, got {other:?}"),
    }
    session.navigator_mut().go_to_page("2").expect("string lookup finds numbered page");
    assert_eq!(session.navigator().current_page_id(), Some(&PageId::Number(2)));
}

#[test]
fn continuation_runs_exactly_once() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![
        Page::new("intro")
            .on_shown(|nav: &mut PageNavigator<u32>| {
                nav.prompt_to_continue("Go on", |nav| {
                    *nav.state_mut() += 1;
                    Ok(())
                })
            })
            .with_option(DialogOption::new("Bye", |_| Ok(())).with_id("bye")),
    ])
    .expect("unique ids");
    let mut session = h.open(dialog, 0);
    assert!(session.navigator().is_waiting_on_continue());
    assert_eq!(h.option_ids(), vec![CONTINUE_OPTION_ID.to_string()]);

    session.option_selected("Go on", CONTINUE_OPTION_ID).expect("resume");
    assert_eq!(*session.navigator().state(), 1);
    assert_eq!(h.option_ids(), vec!["bye".to_string()]);

    session.navigator_mut().on_user_pressed_continue().expect("no-op resume");
    assert_eq!(*session.navigator().state(), 1);
}

#[test]
fn nested_pause_replaces_the_stored_continuation() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![Page::new("intro").on_shown(|nav: &mut PageNavigator<Vec<&'static str>>| {
        nav.prompt_to_continue("One", |nav| {
            nav.state_mut().push("first");
            nav.prompt_to_continue("Two", |nav| {
                nav.state_mut().push("second");
                Ok(())
            })
        })
    })])
    .expect("unique ids");
    let mut session = h.open(dialog, Vec::new());
    session.option_selected("One", CONTINUE_OPTION_ID).expect("first resume");
    assert!(session.navigator().is_waiting_on_continue());
    assert_eq!(h.option_ids(), vec![CONTINUE_OPTION_ID.to_string()]);
    session.option_selected("Two", CONTINUE_OPTION_ID).expect("second resume");
    assert!(!session.navigator().is_waiting_on_continue());
    assert_eq!(session.into_state(), vec!["first", "second"]);
}

#[test]
fn stale_option_ids_are_ignored() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![Page::new("intro").with_option(DialogOption::new("Hi", say("Hi.")).with_id("hi"))])
        .expect("unique ids");
    let mut session = h.open(dialog, ());
    session.option_selected("Gone", "no_longer_here").expect("stale selection is benign");
    assert_eq!(session.navigator().current_page_id(), Some(&PageId::from("intro")));
}

#[test]
fn options_on_other_pages_still_dispatch() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![
        Page::new("intro"),
        Page::new("later").with_option(DialogOption::new("Jump", |nav: &mut PageNavigator<()>| nav.go_to_page("intro")).with_id("jump")),
    ])
    .expect("unique ids");
    let mut session = h.open(dialog, ());
    session.navigator_mut().go_to_page("later").expect("later exists");
    session.navigator_mut().go_to_page("intro").expect("intro exists");
    session.option_selected("Jump", "jump").expect("dispatches");
    assert_eq!(session.navigator().current_page_id(), Some(&PageId::from("intro")));
}

#[test]
fn flagged_option_hides_itself_after_selection() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![
        Page::new("intro")
            .with_option(
                DialogOption::new("Ask about pay", say("Twenty thousand."))
                    .with_id("pay")
                    .sets_flag("qg_asked_pay")
                    .hidden_if_flag("qg_asked_pay"),
            )
            .with_option(DialogOption::new("Leave", say("Bye.")).with_id("leave")),
    ])
    .expect("unique ids");
    let mut session = h.open(dialog, ());
    assert_eq!(h.option_ids(), vec!["pay".to_string(), "leave".to_string()]);
    session.option_selected("Ask about pay", "pay").expect("selection");
    assert!(h.host.store.borrow().flag("qg_asked_pay"));
    assert_eq!(h.option_ids(), vec!["leave".to_string()]);
    assert_eq!(h.paragraphs(), vec!["Ask about pay".to_string(), "Twenty thousand.".to_string()]);
}

#[test]
fn manual_handling_skips_the_refresh() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![Page::new("intro").with_option(
        DialogOption::new("Once", say(""))
            .with_id("once")
            .sets_flag("qg_once")
            .hidden_if_flag("qg_once")
            .without_automatic_handling(),
    )])
    .expect("unique ids");
    let mut session = h.open(dialog, ());
    session.option_selected("Once", "once").expect("selection");
    assert_eq!(h.option_ids(), vec!["once".to_string()]);
    session.navigator_mut().refresh_options().expect("refresh");
    assert!(h.option_ids().is_empty());
}

#[test]
fn show_if_is_evaluated_on_every_render() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![Page::new("intro").with_option(
        DialogOption::new("Again", |nav: &mut PageNavigator<u32>| {
            *nav.state_mut() += 1;
            Ok(())
        })
        .with_id("again")
        .show_if(|count| *count < 2),
    )])
    .expect("unique ids");
    let mut session = h.open(dialog, 0);
    session.option_selected("Again", "again").expect("first");
    assert_eq!(h.option_ids(), vec!["again".to_string()]);
    session.option_selected("Again", "again").expect("second");
    assert!(h.option_ids().is_empty());
}

#[test]
fn placeholders_and_highlights_reach_the_surface() {
    let h = Harness::new();
    h.services.text.borrow_mut().set("pay", || Some("20,000".into()));
    let dialog = Dialog::new(vec![Page::new("intro").on_shown(say("It pays ==${pay}== credits."))]).expect("unique ids");
    let _session = h.open(dialog, ());
    let surface = h.surface.borrow();
    assert_eq!(surface.paragraphs[0].text, "It pays 20,000 credits.");
    assert_eq!(surface.paragraphs[0].highlights, vec!["20,000".to_string()]);
}

#[test]
fn close_runs_hooks_marks_offer_and_rejects_navigation() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![Page::new("intro").with_option(
        DialogOption::new("Leave", |nav: &mut PageNavigator<Vec<String>>| {
            nav.do_on_close(|log| log.push("closed".into()));
            nav.close(true);
            Ok(())
        })
        .with_id("leave"),
    )])
    .expect("unique ids");
    let surface: Rc<RefCell<dyn PresentationSurface>> = h.surface.clone();
    let creator = CreatorKey::new("riley_bar");
    let mut session =
        DialogSession::open_for_offer(dialog, Vec::new(), surface, &h.services, creator.clone()).expect("opens");
    session.option_selected("Leave", "leave").expect("closes");

    assert!(session.is_closed());
    assert!(h.surface.borrow().dismissed);
    assert!(h.host.offers.borrow().interacted.contains(&creator));
    assert!(matches!(
        session.navigator_mut().go_to_page("intro"),
        Err(DialogError::SessionClosed)
    ));
    session.option_selected("Leave", "leave").expect("ignored after close");
    assert_eq!(session.into_state(), vec!["closed".to_string()]);
}

#[test]
fn closing_without_do_not_offer_again_leaves_the_offer_alone() {
    let h = Harness::new();
    let dialog = Dialog::<()>::new(vec![Page::new("intro")]).expect("unique ids");
    let surface: Rc<RefCell<dyn PresentationSurface>> = h.surface.clone();
    let creator = CreatorKey::new("riley_bar");
    let mut session = DialogSession::open_for_offer(dialog, (), surface, &h.services, creator.clone()).expect("opens");
    session.close(false);
    assert!(!h.host.offers.borrow().interacted.contains(&creator));
}

#[test]
fn interaction_hook_and_first_page_selector_run_on_open() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![Page::new("stranger"), Page::new("friend")])
        .expect("unique ids")
        .on_interaction_started(|nav: &mut PageNavigator<bool>| {
            *nav.state_mut() = nav.flag("qg_met_riley");
            Ok(())
        })
        .with_first_page(|met| PageId::from(if *met { "friend" } else { "stranger" }));

    let session = h.open(dialog.clone(), false);
    assert_eq!(session.navigator().current_page_id(), Some(&PageId::from("stranger")));

    h.host.store.borrow_mut().set("qg_met_riley", questgiver_data::StoredValue::Bool(true));
    let session = h.open(dialog, false);
    assert_eq!(session.navigator().current_page_id(), Some(&PageId::from("friend")));
}

#[test]
fn empty_dialog_opens_with_no_page() {
    let h = Harness::new();
    let mut session = h.open(Dialog::<()>::new(Vec::new()).expect("empty is fine"), ());
    assert!(session.navigator().current_page().is_none());
    assert!(matches!(
        session.navigator_mut().refresh_options(),
        Err(DialogError::NoCurrentPage)
    ));
}

#[test]
fn pause_in_the_interaction_hook_does_not_hide_the_first_page() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![
        Page::new("intro").with_option(DialogOption::new("Hi", say("Hi.")).with_id("hi")),
    ])
    .expect("unique ids")
    .on_interaction_started(|nav: &mut PageNavigator<()>| nav.prompt_to_continue("Go on", |_| Ok(())));

    let session = h.open(dialog, ());
    assert_eq!(session.navigator().current_page_id(), Some(&PageId::from("intro")));
    assert!(!session.navigator().is_waiting_on_continue());
    assert_eq!(h.option_ids(), vec!["hi".to_string()]);
}

#[test]
fn navigating_away_from_a_pause_shows_the_new_page_options() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![
        Page::new("a").with_option(
            DialogOption::new("Onward", |nav: &mut PageNavigator<u32>| {
                nav.prompt_to_continue("Go on", |nav| {
                    *nav.state_mut() += 1;
                    Ok(())
                })?;
                nav.go_to_page("b")
            })
            .with_id("onward"),
        ),
        Page::new("b").with_option(DialogOption::new("Back", |nav: &mut PageNavigator<u32>| nav.go_to_page("a")).with_id("back")),
    ])
    .expect("unique ids");

    let mut session = h.open(dialog, 0);
    session.option_selected("Onward", "onward").expect("selection");
    assert_eq!(session.navigator().current_page_id(), Some(&PageId::from("b")));
    assert!(!session.navigator().is_waiting_on_continue());
    assert_eq!(h.option_ids(), vec!["back".to_string()]);

    session.navigator_mut().on_user_pressed_continue().expect("nothing to resume");
    assert_eq!(*session.navigator().state(), 0);
}

#[test]
fn pause_entered_by_the_page_itself_still_holds_its_options() {
    let h = Harness::new();
    let dialog = Dialog::new(vec![
        Page::new("a").with_option(DialogOption::new("To b", |nav: &mut PageNavigator<()>| nav.go_to_page("b")).with_id("to_b")),
        Page::new("b")
            .on_shown(|nav: &mut PageNavigator<()>| nav.prompt_to_continue("Go on", |_| Ok(())))
            .with_option(DialogOption::new("Stay", say("")).with_id("stay")),
    ])
    .expect("unique ids");

    let mut session = h.open(dialog, ());
    session.option_selected("To b", "to_b").expect("selection");
    assert!(session.navigator().is_waiting_on_continue());
    assert_eq!(h.option_ids(), vec![CONTINUE_OPTION_ID.to_string()]);
    session.option_selected("Go on", CONTINUE_OPTION_ID).expect("resume");
    assert_eq!(h.option_ids(), vec!["stay".to_string()]);
}
