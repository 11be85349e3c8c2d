#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Questgiver demo **
//! Drives one courier quest through a terminal dialog using the in-memory host.

use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use colored::Colorize;
use log::info;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use questgiver::host::memory::MemoryHost;
use questgiver::host::{Intel, PresentationSurface, Services};
use questgiver::style::DialogStyle;
use questgiver::terminal::TerminalSurface;
use questgiver::{
    Dialog, DialogOption, DialogSession, IntelDescriptor, OfferDescriptor, Page, PageNavigator, PersistentProperty,
    QuestFacilitator, Questgiver, Stage, StageController, load_config,
};
use questgiver_data::{CreatorKey, Image, IntelClass, OfferSite, Progress, Shortcut, TextColor};

const DESTINATIONS: &[&str] = &["Gilead", "Jangala", "Chicomoztoc", "Asharu", "Volturn"];

#[derive(Debug, Clone, Serialize, Deserialize)]
enum CourierStage {
    NotStarted,
    Deliver { destination: String },
    Done,
    Abandoned,
}

impl Stage for CourierStage {
    fn progress(&self) -> Progress {
        match self {
            CourierStage::NotStarted | CourierStage::Abandoned => Progress::NotStarted,
            CourierStage::Deliver { .. } => Progress::InProgress,
            CourierStage::Done => Progress::Completed,
        }
    }
}

type Courier = Rc<StageController<CourierStage>>;

fn courier_quest(services: &Services) -> Courier {
    let destination: PersistentProperty<Option<String>> =
        PersistentProperty::new(services.config.persisted_key("courier_destination"), || None);
    let regen_store = Rc::clone(&services.store);
    let regen_destination = destination.clone();
    let text_store = Rc::clone(&services.store);
    let text_destination = destination.clone();
    let intel_store = Rc::clone(&services.store);

    let quest = StageController::new("courier", || CourierStage::NotStarted, services)
        .with_intel(IntelDescriptor::new(IntelClass::new("courier"), move || {
            let to = destination
                .get(&*intel_store.borrow())
                .context("courier has no destination")?;
            Ok(Intel::new(IntelClass::new("courier"), format!("Deliver a parcel to {to}")))
        }))
        .with_offer(
            OfferDescriptor::new(CreatorKey::new("courier_bar"), || true, |site| site.populated).with_regenerate(
                move |site| {
                    let choices: Vec<_> = DESTINATIONS.iter().filter(|d| **d != site.name).collect();
                    let to = choices
                        .choose(&mut rand::rng())
                        .context("no destination other than the current site")?;
                    regen_destination.set(&mut *regen_store.borrow_mut(), &Some((**to).to_string()))?;
                    Ok(())
                },
            ),
        )
        .with_text_replacements(move |text| {
            let store = Rc::clone(&text_store);
            let destination = text_destination.clone();
            text.set("courierDestination", move || destination.get(&*store.borrow()));
        });
    Rc::new(quest)
}

/// Per-session state of the bar conversation.
#[derive(Debug, Default)]
struct BarTalk {
    haggles: u32,
}

fn bar_dialog(quest: &Courier) -> Result<Dialog<BarTalk>> {
    let accept = Rc::clone(quest);
    let pages = vec![
        Page::<BarTalk>::new("intro")
            .with_image(Image::portrait("characters", "riley"))
            .on_shown(|nav| {
                nav.para("A courier named ==Riley== waves you over. \"Got a parcel bound for ==${courierDestination}==. Interested?\"");
                Ok(())
            })
            .with_option(
                DialogOption::new("Ask about the pay", |nav: &mut PageNavigator<BarTalk>| {
                    nav.state_mut().haggles += 1;
                    nav.para("\"==20,000== credits, half up front.\"");
                    Ok(())
                })
                .with_id("pay")
                .sets_flag("qg_courier_asked_pay")
                .hidden_if_flag("qg_courier_asked_pay"),
            )
            .with_option(
                DialogOption::new("Take the job", move |nav: &mut PageNavigator<BarTalk>| {
                    let to = nav
                        .services()
                        .text
                        .borrow()
                        .resolve("courierDestination")
                        .unwrap_or_else(|| "somewhere".to_string());
                    accept.set_stage(CourierStage::Deliver { destination: to })?;
                    nav.para("Riley slides the parcel across the table.");
                    nav.pause(|nav| {
                        nav.para("\"Don't open it.\"");
                        nav.close(true);
                        Ok(())
                    })
                })
                .with_id("accept")
                .with_shortcut(Shortcut::key('y'))
                .with_text_color(TextColor::rgb(110, 220, 110)),
            )
            .with_option(
                DialogOption::new("Not today", |nav: &mut PageNavigator<BarTalk>| nav.go_to_page("decline"))
                    .with_id("decline")
                    .with_shortcut(Shortcut::key('n'))
                    .with_tooltip(|talk: &BarTalk| format!("You asked about pay {} time(s).", talk.haggles)),
            ),
        Page::<BarTalk>::new("decline")
            .on_shown(|nav| {
                nav.para("Riley shrugs. \"Suit yourself.\"");
                Ok(())
            })
            .with_option(DialogOption::new("Leave", |nav: &mut PageNavigator<BarTalk>| {
                nav.close(false);
                Ok(())
            })),
    ];
    Ok(Dialog::new(pages)?)
}

fn print_summary(host: &MemoryHost, quest: &Courier) {
    println!("{}", "Quest state".heading_style());
    println!("  stage: {:?} ({})", quest.stage(), quest.progress());
    let pool = host.offers.borrow();
    println!("  offers in pool: {}", pool.entries.len());
    for record in &host.intel.borrow().records {
        let status = match (record.ended, record.ending_in_days) {
            (true, _) => "ended".to_string(),
            (false, Some(days)) => format!("ending in {days} days"),
            (false, None) => "active".to_string(),
        };
        println!("  intel: {} [{status}]", record.intel.title);
    }
    println!();
}

fn run_dialog(session: &mut DialogSession<BarTalk>, surface: &Rc<RefCell<TerminalSurface>>) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    while !session.is_closed() {
        surface.borrow().print_options();
        print!("{}", "> ".dimmed());
        std::io::stdout().flush().context("flushing prompt")?;
        let Some(line) = lines.next() else {
            info!("input closed, leaving the bar");
            session.close(false);
            break;
        };
        let line = line.context("reading choice")?;
        let input = line.trim();
        let picked = match input.parse::<usize>() {
            Ok(n) => surface.borrow().choose(n),
            Err(_) => input.chars().next().and_then(|c| surface.borrow().choose_shortcut(c)),
        };
        match picked {
            Some((text, id)) => session.option_selected(&text, &id)?,
            None => println!("{}", "Pick one of the numbered options.".error_style()),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path)),
        None => questgiver::QuestgiverConfig::default(),
    };
    info!("Start: questgiver demo with prefix '{}'", config.mod_prefix);

    let host = MemoryHost::new();
    let services = host.services(config);
    let mut runtime = Questgiver::new(services.clone());
    let courier = courier_quest(&services);
    let facilitator: Rc<dyn QuestFacilitator> = courier.clone();
    runtime.load_quests(vec![facilitator], Vec::new());
    runtime.advance();

    let bar = OfferSite {
        id: "asharu".into(),
        name: "Asharu".into(),
        faction_id: "independent".into(),
        size: 4,
        populated: true,
    };
    print_summary(&host, &courier);

    if courier.should_offer_at(&bar) {
        let surface = Rc::new(RefCell::new(TerminalSurface::new()));
        let dyn_surface: Rc<RefCell<dyn PresentationSurface>> = surface.clone();
        let dialog = bar_dialog(&courier)?;
        let mut session =
            DialogSession::open_for_offer(dialog, BarTalk::default(), dyn_surface, &services, CreatorKey::new("courier_bar"))?;
        run_dialog(&mut session, &surface)?;
    } else {
        println!("Nobody at the {} bar has work for you.", bar.name);
    }

    host.clock.advance_days(1.0);
    runtime.advance();
    print_summary(&host, &courier);

    if courier.progress() == Progress::InProgress {
        courier.set_stage(CourierStage::Done)?;
        println!("{}", "You deliver the parcel.".echo_style());
        print_summary(&host, &courier);
    }
    runtime.stop();
    Ok(())
}
