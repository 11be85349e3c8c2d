//! Opening dialogs and feeding them player input.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info};
use questgiver_data::{CreatorKey, StoredValue};

use super::{Dialog, DialogError, PageNavigator};
use crate::host::{PresentationSurface, Services};

/// One open interaction with a dialog. Created when the dialog opens and dropped when it
/// closes; nothing here is persisted.
#[derive(Debug)]
pub struct DialogSession<S> {
    navigator: PageNavigator<S>,
}

impl<S> DialogSession<S> {
    /// Open `dialog` on `surface`.
    ///
    /// Runs the dialog's interaction-started hook, then shows the page picked by its
    /// first-page selector, or its first page. A dialog without pages opens blank.
    ///
    /// # Errors
    /// - [`DialogError::NoSuchPage`] if the selector names a missing page
    /// - anything the hook or the first page's callback returns
    pub fn open(
        dialog: Dialog<S>,
        state: S,
        surface: Rc<RefCell<dyn PresentationSurface>>,
        services: &Services,
    ) -> Result<DialogSession<S>, DialogError> {
        Self::start(PageNavigator::new(dialog, state, surface, services.clone(), None))
    }

    /// Open a dialog that was reached through an offer from `creator`.
    ///
    /// # Errors
    /// Same as [`open`](Self::open).
    pub fn open_for_offer(
        dialog: Dialog<S>,
        state: S,
        surface: Rc<RefCell<dyn PresentationSurface>>,
        services: &Services,
        creator: CreatorKey,
    ) -> Result<DialogSession<S>, DialogError> {
        Self::start(PageNavigator::new(dialog, state, surface, services.clone(), Some(creator)))
    }

    fn start(mut navigator: PageNavigator<S>) -> Result<DialogSession<S>, DialogError> {
        info!("opening dialog with pages {:?}", navigator.dialog().page_ids());
        if let Some(started) = navigator.dialog().interaction_started() {
            started(&mut navigator)?;
        }
        if !navigator.is_closed() && navigator.current_page().is_none() {
            if let Some(selector) = navigator.dialog().first_page_selector() {
                let id = selector(navigator.state());
                navigator.go_to_page(id)?;
            } else if let Some(first) = navigator.dialog().pages().first().cloned() {
                navigator.show_page(first)?;
            }
        }
        Ok(DialogSession { navigator })
    }

    /// Handle the player picking an option.
    ///
    /// The option's text is echoed as a paragraph before dispatch. After the option's
    /// callback its durable flag, if any, is set, and unless the option handles its own
    /// refresh the current page's options are redrawn so flag-guarded siblings update.
    ///
    /// # Errors
    /// - anything the option's callback returns
    pub fn option_selected(&mut self, text: &str, data: &str) -> Result<(), DialogError> {
        if self.navigator.is_closed() {
            debug!("dialog closed, ignoring '{data}'");
            return Ok(());
        }
        let color = self.navigator.dialog().find_option(data).and_then(|option| option.text_color);
        match color {
            Some(color) => self.navigator.para_colored(text, color),
            None => self.navigator.para(text),
        }

        let Some(option) = self.navigator.on_option_selected(text, data)? else {
            return Ok(());
        };
        if let Some(flag) = &option.flag_to_set {
            self.navigator
                .services()
                .store
                .borrow_mut()
                .set(flag, StoredValue::Bool(true));
        }
        if !option.disable_automatic_handling
            && !self.navigator.is_closed()
            && self.navigator.current_page().is_some()
        {
            self.navigator.refresh_options()?;
        }
        Ok(())
    }

    pub fn navigator(&self) -> &PageNavigator<S> {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut PageNavigator<S> {
        &mut self.navigator
    }

    pub fn close(&mut self, do_not_offer_again: bool) {
        self.navigator.close(do_not_offer_again);
    }

    pub fn is_closed(&self) -> bool {
        self.navigator.is_closed()
    }

    pub fn into_state(self) -> S {
        self.navigator.into_state()
    }
}
