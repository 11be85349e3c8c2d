//! Paginated dialog definitions.
//!
//! A [`Dialog`] is an immutable list of [`Page`]s, each with its ordered
//! [`DialogOption`]s. Behavior lives in closures that receive the session's
//! [`PageNavigator`], which is how an option moves the conversation along.
//!
//! `S` is the dialog's own state: whatever the quest author wants the callbacks to see
//! and mutate for the duration of one interaction.

pub mod navigator;
pub mod session;

pub use navigator::*;
pub use session::*;

use std::fmt;
use std::rc::Rc;

use questgiver_data::{Image, PageId, Shortcut, TextColor, validate_unique_ids};
use thiserror::Error;

use crate::host::DurableStore;
use crate::store::StoreError;

/// Option id of the synthetic "continue" affordance shown while a page is paused.
pub const CONTINUE_OPTION_ID: &str = "questgiver_continue_button_id";

/// Navigation and dialog construction errors.
#[derive(Debug, Error)]
pub enum DialogError {
    #[error("dialog defines duplicate page ids: {}", quoted(.ids))]
    DuplicatePageIds { ids: Vec<String> },
    #[error("no page with id '{requested}'. Pages: {}.", quoted(.known))]
    NoSuchPage { requested: String, known: Vec<String> },
    #[error("no page is currently shown")]
    NoCurrentPage,
    #[error("dialog session is already closed")]
    SessionClosed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn quoted(ids: &[String]) -> String {
    ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ")
}

/// Callback run with the session's navigator.
pub type NavCallback<S> = Rc<dyn Fn(&mut PageNavigator<S>) -> Result<(), DialogError>>;
/// Text computed from dialog state at render time.
pub type TextProducer<S> = Rc<dyn Fn(&S) -> String>;
/// Visibility predicate evaluated on every render.
pub type ShowIf<S> = Rc<dyn Fn(&S) -> bool>;
/// Chooses the page a session opens on.
pub type PageSelector<S> = Rc<dyn Fn(&S) -> PageId>;

/// One screen of a dialog.
pub struct Page<S> {
    pub id: PageId,
    pub image: Option<Image>,
    on_shown: Option<NavCallback<S>>,
    pub options: Vec<DialogOption<S>>,
}

impl<S> Page<S> {
    pub fn new(id: impl Into<PageId>) -> Page<S> {
        Page {
            id: id.into(),
            image: None,
            on_shown: None,
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: Image) -> Page<S> {
        self.image = Some(image);
        self
    }

    /// Run `callback` each time the page is shown, before its options are rendered.
    #[must_use]
    pub fn on_shown(mut self, callback: impl Fn(&mut PageNavigator<S>) -> Result<(), DialogError> + 'static) -> Page<S> {
        self.on_shown = Some(Rc::new(callback));
        self
    }

    #[must_use]
    pub fn with_option(mut self, option: DialogOption<S>) -> Page<S> {
        self.options.push(option);
        self
    }

    pub(crate) fn shown_callback(&self) -> Option<NavCallback<S>> {
        self.on_shown.clone()
    }
}

impl<S> fmt::Debug for Page<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("image", &self.image)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A selectable choice on a page.
pub struct DialogOption<S> {
    pub id: String,
    text: TextProducer<S>,
    show_if: Option<ShowIf<S>>,
    pub shortcut: Option<Shortcut>,
    tooltip: Option<TextProducer<S>>,
    pub text_color: Option<TextColor>,
    on_selected: NavCallback<S>,
    /// Durable flag set to `true` once the option's callback has run.
    pub flag_to_set: Option<String>,
    /// Hide the option while this durable flag is `true`.
    pub hide_if_flag_true: Option<String>,
    /// When set, the session leaves option refreshing to the callback.
    pub disable_automatic_handling: bool,
}

impl<S> Clone for DialogOption<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            text: Rc::clone(&self.text),
            show_if: self.show_if.clone(),
            shortcut: self.shortcut,
            tooltip: self.tooltip.clone(),
            text_color: self.text_color,
            on_selected: Rc::clone(&self.on_selected),
            flag_to_set: self.flag_to_set.clone(),
            hide_if_flag_true: self.hide_if_flag_true.clone(),
            disable_automatic_handling: self.disable_automatic_handling,
        }
    }
}

impl<S> DialogOption<S> {
    /// An option with fixed text and a random id.
    pub fn new(
        text: impl Into<String>,
        on_selected: impl Fn(&mut PageNavigator<S>) -> Result<(), DialogError> + 'static,
    ) -> DialogOption<S> {
        let text = text.into();
        Self::dynamic(move |_| text.clone(), on_selected)
    }

    /// An option whose text is computed from the dialog state on each render.
    pub fn dynamic(
        text: impl Fn(&S) -> String + 'static,
        on_selected: impl Fn(&mut PageNavigator<S>) -> Result<(), DialogError> + 'static,
    ) -> DialogOption<S> {
        DialogOption {
            id: rand::random::<u32>().to_string(),
            text: Rc::new(text),
            show_if: None,
            shortcut: None,
            tooltip: None,
            text_color: None,
            on_selected: Rc::new(on_selected),
            flag_to_set: None,
            hide_if_flag_true: None,
            disable_automatic_handling: false,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> DialogOption<S> {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn show_if(mut self, predicate: impl Fn(&S) -> bool + 'static) -> DialogOption<S> {
        self.show_if = Some(Rc::new(predicate));
        self
    }

    #[must_use]
    pub fn with_shortcut(mut self, shortcut: Shortcut) -> DialogOption<S> {
        self.shortcut = Some(shortcut);
        self
    }

    #[must_use]
    pub fn with_tooltip(mut self, tooltip: impl Fn(&S) -> String + 'static) -> DialogOption<S> {
        self.tooltip = Some(Rc::new(tooltip));
        self
    }

    #[must_use]
    pub fn with_text_color(mut self, color: TextColor) -> DialogOption<S> {
        self.text_color = Some(color);
        self
    }

    #[must_use]
    pub fn sets_flag(mut self, key: impl Into<String>) -> DialogOption<S> {
        self.flag_to_set = Some(key.into());
        self
    }

    #[must_use]
    pub fn hidden_if_flag(mut self, key: impl Into<String>) -> DialogOption<S> {
        self.hide_if_flag_true = Some(key.into());
        self
    }

    #[must_use]
    pub fn without_automatic_handling(mut self) -> DialogOption<S> {
        self.disable_automatic_handling = true;
        self
    }

    pub fn text(&self, state: &S) -> String {
        (self.text)(state)
    }

    pub fn tooltip(&self, state: &S) -> Option<String> {
        self.tooltip.as_ref().map(|tooltip| tooltip(state))
    }

    /// Whether the option should be rendered right now.
    pub fn is_visible(&self, state: &S, store: &dyn DurableStore) -> bool {
        if let Some(flag) = &self.hide_if_flag_true
            && store.flag(flag)
        {
            return false;
        }
        self.show_if.as_ref().is_none_or(|show_if| show_if(state))
    }

    pub(crate) fn callback(&self) -> NavCallback<S> {
        Rc::clone(&self.on_selected)
    }
}

impl<S> fmt::Debug for DialogOption<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogOption")
            .field("id", &self.id)
            .field("shortcut", &self.shortcut)
            .field("flag_to_set", &self.flag_to_set)
            .field("hide_if_flag_true", &self.hide_if_flag_true)
            .finish_non_exhaustive()
    }
}

/// An immutable set of pages plus the hooks run when a session opens.
pub struct Dialog<S> {
    pages: Rc<Vec<Rc<Page<S>>>>,
    on_interaction_started: Option<NavCallback<S>>,
    first_page_selector: Option<PageSelector<S>>,
}

impl<S> Clone for Dialog<S> {
    fn clone(&self) -> Self {
        Self {
            pages: Rc::clone(&self.pages),
            on_interaction_started: self.on_interaction_started.clone(),
            first_page_selector: self.first_page_selector.clone(),
        }
    }
}

impl<S> Dialog<S> {
    /// Build a dialog from its pages.
    ///
    /// # Errors
    /// - [`DialogError::DuplicatePageIds`] if two pages share an id
    pub fn new(pages: Vec<Page<S>>) -> Result<Dialog<S>, DialogError> {
        let duplicates: Vec<String> = validate_unique_ids("page", pages.iter().map(|page| &page.id))
            .into_iter()
            .map(|e| match e {
                questgiver_data::ValidationError::DuplicateId { id, .. } => id,
                other => other.to_string(),
            })
            .collect();
        if !duplicates.is_empty() {
            return Err(DialogError::DuplicatePageIds { ids: duplicates });
        }
        Ok(Dialog {
            pages: Rc::new(pages.into_iter().map(Rc::new).collect()),
            on_interaction_started: None,
            first_page_selector: None,
        })
    }

    /// Run `callback` when a session opens, before the first page is shown.
    #[must_use]
    pub fn on_interaction_started(
        mut self,
        callback: impl Fn(&mut PageNavigator<S>) -> Result<(), DialogError> + 'static,
    ) -> Dialog<S> {
        self.on_interaction_started = Some(Rc::new(callback));
        self
    }

    /// Open sessions on the page chosen by `selector` instead of the first page.
    #[must_use]
    pub fn with_first_page(mut self, selector: impl Fn(&S) -> PageId + 'static) -> Dialog<S> {
        self.first_page_selector = Some(Rc::new(selector));
        self
    }

    pub fn pages(&self) -> &[Rc<Page<S>>] {
        &self.pages
    }

    pub fn page_ids(&self) -> Vec<String> {
        self.pages.iter().map(|page| page.id.to_string()).collect()
    }

    /// Look a page up by id, falling back to comparing rendered ids so `"3"` finds page `3`.
    pub fn find_page(&self, id: &PageId) -> Option<Rc<Page<S>>> {
        self.pages
            .iter()
            .find(|page| &page.id == id)
            .or_else(|| {
                let wanted = id.to_string();
                self.pages.iter().find(|page| page.id.to_string() == wanted)
            })
            .cloned()
    }

    /// The first option with `id` on any page.
    pub fn find_option(&self, id: &str) -> Option<DialogOption<S>> {
        self.pages
            .iter()
            .flat_map(|page| page.options.iter())
            .find(|option| option.id == id)
            .cloned()
    }

    pub(crate) fn interaction_started(&self) -> Option<NavCallback<S>> {
        self.on_interaction_started.clone()
    }

    pub(crate) fn first_page_selector(&self) -> Option<PageSelector<S>> {
        self.first_page_selector.clone()
    }
}

impl<S> fmt::Debug for Dialog<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialog").field("pages", &self.page_ids()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryStore;
    use questgiver_data::StoredValue;

    fn noop<S>() -> impl Fn(&mut PageNavigator<S>) -> Result<(), DialogError> + 'static {
        |_| Ok(())
    }

    #[test]
    fn unique_pages_build() {
        let dialog = Dialog::<()>::new(vec![Page::new("intro"), Page::new("deal"), Page::new(3)]);
        assert!(dialog.is_ok());
    }

    #[test]
    fn duplicate_pages_are_rejected_with_their_ids() {
        let result = Dialog::<()>::new(vec![Page::new("intro"), Page::new("deal"), Page::new("intro")]);
        match result {
            Err(DialogError::DuplicatePageIds { ids }) => assert_eq!(ids, vec!["intro".to_string()]),
            other => panic!("expected duplicate ids, got {other:?}"),
        }
    }

    #[test]
    fn each_duplicate_page_is_listed_once() {
        let result = Dialog::<()>::new(vec![Page::new("a"), Page::new("a"), Page::new("a")]);
        match result {
            Err(DialogError::DuplicatePageIds { ids }) => assert_eq!(ids, vec!["a".to_string()]),
            other => panic!("expected duplicate ids, got {other:?}"),
        }
    }

    #[test]
    fn named_and_numbered_pages_with_the_same_text_are_distinct() -> Result<(), DialogError> {
        let dialog = Dialog::<()>::new(vec![Page::new("2"), Page::new(2)])?;
        let numbered = dialog.find_page(&PageId::from(2)).expect("numbered page");
        assert_eq!(numbered.id, PageId::Number(2));
        let named = dialog.find_page(&PageId::from("2")).expect("named page");
        assert_eq!(named.id, PageId::from("2"));
        Ok(())
    }

    #[test]
    fn pages_are_found_across_id_types() -> Result<(), DialogError> {
        let dialog = Dialog::<()>::new(vec![Page::new("intro"), Page::new(2)])?;
        assert!(dialog.find_page(&PageId::from(2)).is_some());
        assert!(dialog.find_page(&PageId::from("2")).is_some());
        assert!(dialog.find_page(&PageId::from("missing")).is_none());
        Ok(())
    }

    #[test]
    fn generated_option_ids_differ() {
        let a = DialogOption::<()>::new("Yes", noop());
        let b = DialogOption::<()>::new("No", noop());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn visibility_honors_predicate_and_flag() {
        let mut store = MemoryStore::default();
        let option = DialogOption::<u32>::new("Ask again", noop())
            .show_if(|asked| *asked < 3)
            .hidden_if_flag("qg_asked_twice");
        assert!(option.is_visible(&0, &store));
        assert!(!option.is_visible(&3, &store));
        store.set("qg_asked_twice", StoredValue::Bool(true));
        assert!(!option.is_visible(&0, &store));
    }

    #[test]
    fn dynamic_text_and_tooltip_read_state() {
        let option = DialogOption::<String>::dynamic(|name| format!("Greet {name}"), noop())
            .with_tooltip(|name| format!("{name} looks busy"));
        let state = "Riley".to_string();
        assert_eq!(option.text(&state), "Greet Riley");
        assert_eq!(option.tooltip(&state).as_deref(), Some("Riley looks busy"));
    }
}
