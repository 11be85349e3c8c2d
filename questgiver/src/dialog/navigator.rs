//! Per-session page state machine.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, info, warn};
use questgiver_data::{CreatorKey, Image, PageId, StoredValue, TextColor};

use super::{CONTINUE_OPTION_ID, Dialog, DialogError, DialogOption, Page};
use crate::host::{Paragraph, PresentationSurface, RenderedOption, Services};
use crate::text::highlights;

/// Work deferred until the player presses continue.
pub type Continuation<S> = Box<dyn FnOnce(&mut PageNavigator<S>) -> Result<(), DialogError>>;

/// Drives one open dialog: which page is current, whether it is paused, and what the
/// surface shows.
pub struct PageNavigator<S> {
    state: S,
    dialog: Dialog<S>,
    surface: Rc<RefCell<dyn PresentationSurface>>,
    services: Services,
    owner: Option<CreatorKey>,
    current_page: Option<Rc<Page<S>>>,
    continuation: Option<Continuation<S>>,
    on_close: Vec<Box<dyn FnOnce(&mut S)>>,
    closed: bool,
}

impl<S> PageNavigator<S> {
    pub(crate) fn new(
        dialog: Dialog<S>,
        state: S,
        surface: Rc<RefCell<dyn PresentationSurface>>,
        services: Services,
        owner: Option<CreatorKey>,
    ) -> PageNavigator<S> {
        PageNavigator {
            state,
            dialog,
            surface,
            services,
            owner,
            current_page: None,
            continuation: None,
            on_close: Vec::new(),
            closed: false,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    pub fn dialog(&self) -> &Dialog<S> {
        &self.dialog
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn current_page(&self) -> Option<&Rc<Page<S>>> {
        self.current_page.as_ref()
    }

    pub fn current_page_id(&self) -> Option<&PageId> {
        self.current_page.as_ref().map(|page| &page.id)
    }

    pub fn is_waiting_on_continue(&self) -> bool {
        self.continuation.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), DialogError> {
        if self.closed { Err(DialogError::SessionClosed) } else { Ok(()) }
    }

    /// Make `page` current and render it.
    ///
    /// The page's shown callback runs before its options are drawn and may navigate on its
    /// own. A pause pending from before is dropped along with its continue button. Options
    /// are only drawn if `page` is still current afterwards and the callback did not pause
    /// for a continue.
    ///
    /// # Errors
    /// - [`DialogError::SessionClosed`] after [`close`](Self::close)
    /// - anything the shown callback returns
    pub fn show_page(&mut self, page: Rc<Page<S>>) -> Result<(), DialogError> {
        self.ensure_open()?;
        debug!("showing page '{}'", page.id);
        if self.continuation.take().is_some() {
            debug!("dropping pending continue for page '{}'", page.id);
        }
        self.surface.borrow_mut().clear_options();
        if let Some(image) = &page.image {
            self.surface.borrow_mut().show_image(image);
        }
        self.current_page = Some(Rc::clone(&page));

        if let Some(on_shown) = page.shown_callback() {
            on_shown(self)?;
        }

        let still_current = self.current_page.as_ref().is_some_and(|current| Rc::ptr_eq(current, &page));
        if still_current && !self.closed && !self.is_waiting_on_continue() {
            self.render_options(&page);
        }
        Ok(())
    }

    /// Show the page with `id`.
    ///
    /// # Errors
    /// - [`DialogError::NoSuchPage`] listing every known page if `id` matches none
    /// - anything [`show_page`](Self::show_page) returns
    pub fn go_to_page(&mut self, id: impl Into<PageId>) -> Result<(), DialogError> {
        let id = id.into();
        let page = self.dialog.find_page(&id).ok_or_else(|| DialogError::NoSuchPage {
            requested: id.to_string(),
            known: self.dialog.page_ids(),
        })?;
        self.show_page(page)
    }

    /// Replace the options with a single continue button labelled `text`.
    ///
    /// `continuation` runs when the player presses it. Pausing again while paused
    /// replaces the stored continuation.
    ///
    /// # Errors
    /// - [`DialogError::SessionClosed`] after [`close`](Self::close)
    pub fn prompt_to_continue(
        &mut self,
        text: &str,
        continuation: impl FnOnce(&mut PageNavigator<S>) -> Result<(), DialogError> + 'static,
    ) -> Result<(), DialogError> {
        self.ensure_open()?;
        self.continuation = Some(Box::new(continuation));
        let mut surface = self.surface.borrow_mut();
        debug!("clearing options");
        surface.clear_options();
        debug!("adding option {CONTINUE_OPTION_ID} with text '{text}'");
        surface.add_option(RenderedOption {
            id: CONTINUE_OPTION_ID.to_string(),
            text: text.to_string(),
            color: None,
            tooltip: None,
        });
        Ok(())
    }

    /// [`prompt_to_continue`](Self::prompt_to_continue) with the configured label.
    ///
    /// # Errors
    /// - [`DialogError::SessionClosed`] after [`close`](Self::close)
    pub fn pause(
        &mut self,
        continuation: impl FnOnce(&mut PageNavigator<S>) -> Result<(), DialogError> + 'static,
    ) -> Result<(), DialogError> {
        let text = self.services.config.continue_text.clone();
        self.prompt_to_continue(&text, continuation)
    }

    /// Resume a paused page. Without a stored continuation this does nothing.
    ///
    /// # Errors
    /// - [`DialogError::SessionClosed`] after [`close`](Self::close)
    /// - anything the continuation returns
    pub fn on_user_pressed_continue(&mut self) -> Result<(), DialogError> {
        self.ensure_open()?;
        let Some(continuation) = self.continuation.take() else {
            debug!("continue pressed with nothing to resume");
            return Ok(());
        };
        self.surface.borrow_mut().clear_options();
        if let Some(page) = self.current_page.clone() {
            self.render_options(&page);
        }
        continuation(self)
    }

    /// Re-filter and redraw the current page's options without re-running its shown callback.
    ///
    /// # Errors
    /// - [`DialogError::SessionClosed`] after [`close`](Self::close)
    /// - [`DialogError::NoCurrentPage`] if no page has been shown yet
    pub fn refresh_options(&mut self) -> Result<(), DialogError> {
        self.ensure_open()?;
        if self.is_waiting_on_continue() {
            return Ok(());
        }
        let Some(page) = self.current_page.clone() else {
            warn!("refresh requested with no page shown");
            return Err(DialogError::NoCurrentPage);
        };
        debug!("clearing options");
        self.surface.borrow_mut().clear_options();
        self.render_options(&page);
        Ok(())
    }

    /// End the session.
    ///
    /// With `do_not_offer_again`, an offer-backed session marks its creator as
    /// interacted with so it is not offered again at the same place right away.
    /// Closing twice is a no-op.
    pub fn close(&mut self, do_not_offer_again: bool) {
        if self.closed {
            return;
        }
        info!("closing dialog (do_not_offer_again: {do_not_offer_again})");
        for action in std::mem::take(&mut self.on_close) {
            action(&mut self.state);
        }
        if do_not_offer_again && let Some(owner) = &self.owner {
            self.services.offers.borrow_mut().mark_interacted(owner);
        }
        self.continuation = None;
        self.closed = true;
        self.surface.borrow_mut().dismiss();
    }

    /// Register `action` to run once when the session closes.
    pub fn do_on_close(&mut self, action: impl FnOnce(&mut S) + 'static) {
        self.on_close.push(Box::new(action));
    }

    /// Dispatch a selection from the surface.
    ///
    /// `data` is the selected option id. The continue sentinel resumes a paused page,
    /// any other id runs the first matching option on any page. Unknown ids come from
    /// stale UI and are ignored, as is anything selected after close. Returns the option
    /// that ran.
    ///
    /// # Errors
    /// - anything the option callback or continuation returns
    pub fn on_option_selected(&mut self, text: &str, data: &str) -> Result<Option<DialogOption<S>>, DialogError> {
        if self.closed {
            debug!("ignoring selection of '{data}' on a closed dialog");
            return Ok(None);
        }
        info!("selected option '{text}' with data '{data}'");
        if data == CONTINUE_OPTION_ID {
            self.on_user_pressed_continue()?;
            return Ok(None);
        }
        let Some(option) = self.dialog.find_option(data) else {
            debug!("no option with id '{data}', ignoring stale selection");
            return Ok(None);
        };
        (option.callback())(self)?;
        Ok(Some(option))
    }

    /// Print a paragraph, filling `${name}` placeholders and extracting `==highlights==`.
    pub fn para(&mut self, text: &str) {
        self.add_para(text, None);
    }

    pub fn para_colored(&mut self, text: &str, color: TextColor) {
        self.add_para(text, Some(color));
    }

    fn add_para(&mut self, text: &str, color: Option<TextColor>) {
        let formatted = self.services.text.borrow().format(text);
        let marked = highlights(&formatted);
        self.surface.borrow_mut().add_para(Paragraph {
            text: marked.text,
            highlights: marked.highlights,
            color,
        });
    }

    pub fn show_image(&mut self, image: &Image) {
        self.surface.borrow_mut().show_image(image);
    }

    pub fn flag(&self, key: &str) -> bool {
        self.services.store.borrow().flag(key)
    }

    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.services.store.borrow_mut().set(key, StoredValue::Bool(value));
    }

    fn render_options(&self, page: &Page<S>) {
        let store = self.services.store.borrow();
        let text = self.services.text.borrow();
        let mut surface = self.surface.borrow_mut();
        for option in page.options.iter().filter(|option| option.is_visible(&self.state, &*store)) {
            let label = text.format(&option.text(&self.state));
            debug!(
                "adding option {} with text '{label}' and shortcut {:?}",
                option.id, option.shortcut
            );
            surface.add_option(RenderedOption {
                id: option.id.clone(),
                text: label,
                color: option.text_color,
                tooltip: option.tooltip(&self.state).map(|tooltip| text.format(&tooltip)),
            });
            if let Some(shortcut) = option.shortcut {
                surface.set_shortcut(&option.id, shortcut);
            }
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for PageNavigator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageNavigator")
            .field("state", &self.state)
            .field("current_page", &self.current_page_id())
            .field("waiting_on_continue", &self.is_waiting_on_continue())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
