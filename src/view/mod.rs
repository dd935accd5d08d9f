//! Typed view-model of the page
//!
//! The page is a projection of the latest snapshots: a splash screen, four
//! panels of which exactly one is visible, three post sections, and the
//! new-post form. Cards are patched in place as notifications arrive and
//! rebuilt from scratch after every cleanup.

mod render;

pub use render::{escape_html, render_card, render_comment, render_page};

use serde_json::Value;

use crate::config::ViewConfig;
use crate::model::{star_count_from, Comment, Post};

/// The three live post lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Recent,
    MyPosts,
    MyTopPosts,
}

impl SectionKind {
    pub const ALL: [SectionKind; 3] = [
        SectionKind::Recent,
        SectionKind::MyPosts,
        SectionKind::MyTopPosts,
    ];

    /// Element id of the section in the page markup
    pub fn element_id(self) -> &'static str {
        match self {
            SectionKind::Recent => "recent-posts-list",
            SectionKind::MyPosts => "user-posts-list",
            SectionKind::MyTopPosts => "top-user-posts-list",
        }
    }

    pub fn panel(self) -> Panel {
        match self {
            SectionKind::Recent => Panel::Recent,
            SectionKind::MyPosts => Panel::MyPosts,
            SectionKind::MyTopPosts => Panel::MyTopPosts,
        }
    }
}

/// The four mutually exclusive panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Recent,
    MyPosts,
    MyTopPosts,
    AddPost,
}

impl Panel {
    pub const ALL: [Panel; 4] = [Panel::Recent, Panel::MyPosts, Panel::MyTopPosts, Panel::AddPost];

    /// Menu control that lights up for this panel. The add panel is opened
    /// by a separate button with no active state.
    pub fn menu_button(self) -> Option<MenuButton> {
        match self {
            Panel::Recent => Some(MenuButton::Recent),
            Panel::MyPosts => Some(MenuButton::MyPosts),
            Panel::MyTopPosts => Some(MenuButton::MyTopPosts),
            Panel::AddPost => None,
        }
    }

    pub fn element_id(self) -> &'static str {
        match self {
            Panel::AddPost => "add-post",
            Panel::Recent => SectionKind::Recent.element_id(),
            Panel::MyPosts => SectionKind::MyPosts.element_id(),
            Panel::MyTopPosts => SectionKind::MyTopPosts.element_id(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuButton {
    Recent,
    MyPosts,
    MyTopPosts,
}

impl MenuButton {
    pub const ALL: [MenuButton; 3] = [MenuButton::Recent, MenuButton::MyPosts, MenuButton::MyTopPosts];

    pub fn panel(self) -> Panel {
        match self {
            MenuButton::Recent => Panel::Recent,
            MenuButton::MyPosts => Panel::MyPosts,
            MenuButton::MyTopPosts => Panel::MyTopPosts,
        }
    }

    pub fn element_id(self) -> &'static str {
        match self {
            MenuButton::Recent => "menu-recent",
            MenuButton::MyPosts => "menu-my-posts",
            MenuButton::MyTopPosts => "menu-my-top-posts",
        }
    }
}

/// Identity of one constructed card. A post that leaves a section and comes
/// back gets a new card with a new id, so late notifications addressed to
/// the old card never touch the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(pub u64);

/// Material text field state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    pub value: String,
    /// Widget enhancement has run on the element
    pub upgraded: bool,
    /// Floating-label "has content" state
    pub dirty: bool,
}

impl TextField {
    pub fn upgrade(&mut self) {
        self.upgraded = true;
        self.refresh_classes();
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.refresh_classes();
    }

    /// Clears the value without touching the widget classes, the way a
    /// programmatic assignment to the input does
    pub fn clear(&mut self) {
        self.value.clear();
    }

    /// Recompute the widget classes from the current value
    pub fn refresh_classes(&mut self) {
        self.dirty = !self.value.is_empty();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub proverb: TextField,
    pub translation: TextField,
}

impl PostForm {
    pub fn clear(&mut self) {
        self.proverb.clear();
        self.translation.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub id: String,
    pub username: String,
    pub text: String,
}

impl CommentView {
    pub fn new(id: impl Into<String>, comment: &Comment, view: &ViewConfig) -> Self {
        Self {
            id: id.into(),
            username: comment
                .author
                .clone()
                .unwrap_or_else(|| view.anonymous_name.clone()),
            text: comment.text.clone(),
        }
    }
}

/// One rendered post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub card_id: CardId,
    pub post_id: String,
    pub author_id: String,
    /// Card title: the proverb
    pub title: String,
    /// Card body: the translation
    pub text: String,
    pub username: String,
    pub avatar_url: String,
    pub star_count: u64,
    pub starred: bool,
    pub comments: Vec<CommentView>,
    pub comment_input: TextField,
}

impl PostCard {
    pub fn new(card_id: CardId, post_id: impl Into<String>, post: &Post, view: &ViewConfig) -> Self {
        let mut comment_input = TextField::default();
        comment_input.upgrade();
        Self {
            card_id,
            post_id: post_id.into(),
            author_id: post.uid.clone(),
            title: post.text.clone(),
            text: post.translation.clone(),
            username: post
                .author
                .clone()
                .unwrap_or_else(|| view.anonymous_name.clone()),
            avatar_url: post
                .author_pic
                .clone()
                .unwrap_or_else(|| view.placeholder_avatar.clone()),
            // set by the star-count listener
            star_count: 0,
            starred: false,
            comments: Vec::new(),
            comment_input,
        }
    }

    /// Patch the text fields and star count in place
    pub fn patch(&mut self, post: &Post, view: &ViewConfig) {
        self.title = post.text.clone();
        self.username = post
            .author
            .clone()
            .unwrap_or_else(|| view.anonymous_name.clone());
        self.text = post.translation.clone();
        self.star_count = post.star_count;
    }

    pub fn set_star_count(&mut self, value: Option<&Value>) {
        self.star_count = value.map(star_count_from).unwrap_or(0);
    }

    pub fn set_starred(&mut self, value: Option<&Value>) {
        self.starred = is_truthy(value);
    }

    pub fn add_comment(&mut self, comment: CommentView) {
        self.comments.push(comment);
    }

    pub fn comment_mut(&mut self, id: &str) -> Option<&mut CommentView> {
        self.comments.iter_mut().find(|c| c.id == id)
    }

    pub fn remove_comment(&mut self, id: &str) -> Option<CommentView> {
        let index = self.comments.iter().position(|c| c.id == id)?;
        Some(self.comments.remove(index))
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// An ordered list of cards, most recent first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub cards: Vec<PostCard>,
}

impl Section {
    pub fn prepend(&mut self, card: PostCard) {
        self.cards.insert(0, card);
    }

    pub fn card(&self, post_id: &str) -> Option<&PostCard> {
        self.cards.iter().find(|c| c.post_id == post_id)
    }

    pub fn card_mut(&mut self, post_id: &str) -> Option<&mut PostCard> {
        self.cards.iter_mut().find(|c| c.post_id == post_id)
    }

    pub fn remove(&mut self, post_id: &str) -> Option<PostCard> {
        let index = self.cards.iter().position(|c| c.post_id == post_id)?;
        Some(self.cards.remove(index))
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// The whole page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub splash_visible: bool,
    active_panel: Panel,
    recent: Section,
    my_posts: Section,
    my_top_posts: Section,
    pub post_form: PostForm,
    next_card: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// Signed-out page: splash shown, recent panel selected
    pub fn new() -> Self {
        let mut post_form = PostForm::default();
        post_form.proverb.upgrade();
        post_form.translation.upgrade();
        Self {
            splash_visible: true,
            active_panel: Panel::Recent,
            recent: Section::default(),
            my_posts: Section::default(),
            my_top_posts: Section::default(),
            post_form,
            next_card: 0,
        }
    }

    pub fn active_panel(&self) -> Panel {
        self.active_panel
    }

    pub fn is_visible(&self, panel: Panel) -> bool {
        self.active_panel == panel
    }

    pub fn active_menu(&self) -> Option<MenuButton> {
        self.active_panel.menu_button()
    }

    pub fn is_menu_active(&self, button: MenuButton) -> bool {
        self.active_menu() == Some(button)
    }

    /// Show `panel` and hide the other three
    pub fn show_panel(&mut self, panel: Panel) {
        self.active_panel = panel;
    }

    pub fn section(&self, kind: SectionKind) -> &Section {
        match kind {
            SectionKind::Recent => &self.recent,
            SectionKind::MyPosts => &self.my_posts,
            SectionKind::MyTopPosts => &self.my_top_posts,
        }
    }

    pub fn section_mut(&mut self, kind: SectionKind) -> &mut Section {
        match kind {
            SectionKind::Recent => &mut self.recent,
            SectionKind::MyPosts => &mut self.my_posts,
            SectionKind::MyTopPosts => &mut self.my_top_posts,
        }
    }

    pub fn clear_sections(&mut self) {
        for kind in SectionKind::ALL {
            self.section_mut(kind).clear();
        }
    }

    pub fn card_count(&self) -> usize {
        SectionKind::ALL.iter().map(|&k| self.section(k).len()).sum()
    }

    pub fn allocate_card_id(&mut self) -> CardId {
        self.next_card += 1;
        CardId(self.next_card)
    }

    /// Find a card by identity in any section
    pub fn card_by_id_mut(&mut self, card_id: CardId) -> Option<&mut PostCard> {
        let Page {
            recent,
            my_posts,
            my_top_posts,
            ..
        } = self;
        recent
            .cards
            .iter_mut()
            .chain(my_posts.cards.iter_mut())
            .chain(my_top_posts.cards.iter_mut())
            .find(|c| c.card_id == card_id)
    }
}
