//! Inputs to the view controller

use serde_json::Value;

use crate::backend::ChildEvent;
use crate::view::{CardId, MenuButton, SectionKind};

/// A user interaction with the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SignInClicked,
    SignOutClicked,
    MenuClicked(MenuButton),
    /// The floating "add" button
    AddClicked,
    ProverbInput(String),
    TranslationInput(String),
    SubmitPost,
    StarClicked {
        section: SectionKind,
        post_id: String,
    },
    CommentInput {
        section: SectionKind,
        post_id: String,
        text: String,
    },
    SubmitComment {
        section: SectionKind,
        post_id: String,
    },
}

/// A backend notification tagged with the part of the page it updates
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Post list of a section
    Section(SectionKind, ChildEvent),
    /// Comment list of one card
    Comments(CardId, ChildEvent),
    /// `starCount` of the post behind one card
    StarCount(CardId, Option<Value>),
    /// Whether the signed-in user starred the post behind one card
    Starred(CardId, Option<Value>),
}
