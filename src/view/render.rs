//! HTML rendering of the view-model
//!
//! Markup keeps the class vocabulary the page stylesheet expects. All text
//! goes through [`escape_html`], matching `innerText` assignment.

use super::{CommentView, MenuButton, Page, Panel, PostCard, SectionKind, TextField};

/// Escape text for inclusion in element content or a quoted attribute
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn display(visible: bool, shown: &str) -> String {
    if visible {
        format!("display: {shown}")
    } else {
        "display: none".to_string()
    }
}

fn textfield_classes(field: &TextField) -> String {
    let mut classes = String::from("mdl-textfield mdl-js-textfield");
    if field.upgraded {
        classes.push_str(" is-upgraded");
    }
    if field.dirty {
        classes.push_str(" is-dirty");
    }
    classes
}

pub fn render_comment(comment: &CommentView) -> String {
    format!(
        r#"<div class="comment-{id}"><span class="username">{username}</span><span class="comment">{text}</span></div>"#,
        id = escape_html(&comment.id),
        username = escape_html(&comment.username),
        text = escape_html(&comment.text),
    )
}

pub fn render_card(card: &PostCard) -> String {
    let comments: String = card.comments.iter().map(render_comment).collect();
    format!(
        concat!(
            r#"<div class="post post-{id} mdl-cell mdl-cell--12-col mdl-cell--6-col-tablet mdl-cell--4-col-desktop mdl-grid mdl-grid--no-spacing">"#,
            r#"<div class="mdl-card mdl-shadow--2dp">"#,
            r#"<div class="mdl-card__title mdl-color--light-blue-600 mdl-color-text--white">"#,
            r#"<h4 class="mdl-card__title-text">{title}</h4>"#,
            r#"</div>"#,
            r#"<div class="header"><div>"#,
            r#"<div class="avatar" style="background-image: url(&quot;{avatar}&quot;)"></div>"#,
            r#"<div class="username mdl-color-text--black">{username}</div>"#,
            r#"</div></div>"#,
            r#"<span class="star">"#,
            r#"<div class="not-starred material-icons" style="{not_starred}">star_border</div>"#,
            r#"<div class="starred material-icons" style="{starred}">star</div>"#,
            r#"<div class="star-count">{star_count}</div>"#,
            r#"</span>"#,
            r#"<div class="text">{text}</div>"#,
            r#"<div class="comments-container">{comments}</div>"#,
            r##"<form class="add-comment" action="#">"##,
            r#"<div class="{field_classes}">"#,
            r#"<input class="mdl-textfield__input new-comment" type="text" value="{comment_value}">"#,
            r#"<label class="mdl-textfield__label">Comment...</label>"#,
            r#"</div></form>"#,
            r#"</div></div>"#,
        ),
        id = escape_html(&card.post_id),
        title = escape_html(&card.title),
        avatar = escape_html(&card.avatar_url),
        username = escape_html(&card.username),
        not_starred = display(!card.starred, "inline-block"),
        starred = display(card.starred, "inline-block"),
        star_count = card.star_count,
        text = escape_html(&card.text),
        comments = comments,
        field_classes = textfield_classes(&card.comment_input),
        comment_value = escape_html(&card.comment_input.value),
    )
}

fn render_menu(page: &Page) -> String {
    MenuButton::ALL
        .into_iter()
        .map(|button| {
            let active = if page.is_menu_active(button) { " is-active" } else { "" };
            format!(
                r#"<button id="{id}" class="mdl-button{active}"></button>"#,
                id = button.element_id(),
            )
        })
        .collect()
}

fn render_section(page: &Page, kind: SectionKind) -> String {
    let cards: String = page.section(kind).cards.iter().map(render_card).collect();
    format!(
        r#"<section id="{id}" style="{style}"><div class="posts-container mdl-cell mdl-cell--12-col mdl-grid">{cards}</div></section>"#,
        id = kind.element_id(),
        style = display(page.is_visible(kind.panel()), "block"),
    )
}

/// Render the full page body
pub fn render_page(page: &Page) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        r#"<section id="page-splash" style="{}"></section>"#,
        if page.splash_visible { "" } else { "display: none" }
    ));
    out.push_str(&render_menu(page));
    for kind in SectionKind::ALL {
        out.push_str(&render_section(page, kind));
    }
    out.push_str(&format!(
        concat!(
            r##"<section id="add-post" style="{style}"><form id="message-form" action="#">"##,
            r#"<div class="{proverb_classes}"><input class="mdl-textfield__input" id="new-post-title" value="{proverb}"></div>"#,
            r#"<div class="{translation_classes}"><textarea class="mdl-textfield__input" id="new-post-message">{translation}</textarea></div>"#,
            r#"</form></section>"#,
        ),
        style = display(page.is_visible(Panel::AddPost), "block"),
        proverb_classes = textfield_classes(&page.post_form.proverb),
        proverb = escape_html(&page.post_form.proverb.value),
        translation_classes = textfield_classes(&page.post_form.translation),
        translation = escape_html(&page.post_form.translation.value),
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::model::{Comment, Post};
    use crate::view::CardId;

    fn card() -> PostCard {
        let post = Post::new("u1", "<b>Ana</b>", None, "Slow & steady", "T");
        PostCard::new(CardId(1), "p1", &post, &ViewConfig::default())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_card_markup() {
        let mut card = card();
        card.star_count = 2;
        card.starred = true;
        card.add_comment(CommentView::new(
            "c1",
            &Comment {
                text: "hi".into(),
                author: None,
                uid: "u2".into(),
            },
            &ViewConfig::default(),
        ));

        let html = render_card(&card);
        assert!(html.contains(r#"class="post post-p1 "#));
        assert!(html.contains("Slow &amp; steady"));
        assert!(html.contains("&lt;b&gt;Ana&lt;/b&gt;"));
        assert!(html.contains(r#"<div class="star-count">2</div>"#));
        assert!(html.contains(r#"class="starred material-icons" style="display: inline-block""#));
        assert!(html.contains(r#"class="not-starred material-icons" style="display: none""#));
        assert!(html.contains(r#"<div class="comment-c1"><span class="username">Anonymous</span><span class="comment">hi</span></div>"#));
        assert!(html.contains("./silhouette.jpg"));
        assert!(html.contains("is-upgraded"));
    }

    #[test]
    fn test_page_markup_hides_inactive_panels() {
        let mut page = Page::new();
        page.show_panel(Panel::MyTopPosts);
        page.splash_visible = false;

        let html = render_page(&page);
        assert!(html.contains(r#"<section id="page-splash" style="display: none">"#));
        assert!(html.contains(r#"<section id="top-user-posts-list" style="display: block">"#));
        assert!(html.contains(r#"<section id="recent-posts-list" style="display: none">"#));
        assert!(html.contains(r#"<section id="add-post" style="display: none">"#));
        assert!(html.contains(r#"id="menu-my-top-posts" class="mdl-button is-active""#));
        assert!(html.contains(r#"id="menu-recent" class="mdl-button""#));
    }
}
