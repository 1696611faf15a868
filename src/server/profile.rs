//! Profile editing with avatar upload.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Extension;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::identity::RequestContext;
use crate::storage::{users, ProfileUpdate};

use super::view::{self, Page, EDIT_TEMPLATE, FEED_PATH};
use super::AppState;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];
/// Web path under which stored avatars are served.
pub const AVATAR_WEB_PREFIX: &str = "/static/upload/pfp/";

static SCHEME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").expect("static regex"));
static UNSAFE_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static regex"));

pub fn normalize_website(website: &str) -> String {
    if SCHEME_RE.is_match(website) { website.to_string() } else { format!("http://{}", website) }
}

/// Extension allowlist check on the last dot segment, case-insensitive.
pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Reduce a client-supplied name to something safe to join onto a directory:
/// ASCII only, no separators, `[A-Za-z0-9_.-]`, whitespace runs become `_`,
/// no leading or trailing `.`/`_`.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(|c| c.is_ascii()).collect();
    let no_seps = ascii.replace(['/', '\\'], " ");
    let joined = no_seps.split_whitespace().collect::<Vec<_>>().join("_");
    UNSAFE_CHARS_RE.replace_all(&joined, "").trim_matches(|c| c == '.' || c == '_').to_string()
}

struct Upload {
    filename: String,
    bytes: Bytes,
}

/// Write the upload into `dir` under a fresh unique name; returns that name.
async fn store_avatar(dir: &Path, user_id: i64, upload: &Upload) -> AppResult<String> {
    let stored = secure_filename(&format!("{}-{}{}", user_id, Uuid::new_v4(), upload.filename));
    tokio::fs::create_dir_all(dir).await?;
    let dest: PathBuf = dir.join(&stored);
    tokio::fs::write(&dest, &upload.bytes).await?;
    info!(user_id, path = %dest.display(), size = upload.bytes.len(), "avatar stored");
    Ok(stored)
}

fn required(field: &str, value: Option<String>) -> AppResult<String> {
    value.ok_or_else(|| AppError::user("missing_field".to_string(), format!("missing form field '{}'", field)))
}

pub async fn edit_form(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> Response {
    view::render(&state, &ctx, Page::new(EDIT_TEMPLATE))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let user = ctx.require_user()?;

    let (mut nickname, mut aboutme, mut website) = (None, None, None);
    let mut upload: Option<Upload> = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "nickname" => nickname = Some(field.text().await?),
            "aboutme" => aboutme = Some(field.text().await?),
            "website" => website = Some(field.text().await?),
            // A `file` part without a filename is a plain form value, not an upload.
            "file" => {
                if let Some(filename) = field.file_name().map(str::to_string) {
                    let bytes = field.bytes().await?;
                    upload = Some(Upload { filename, bytes });
                }
            }
            _ => {}
        }
    }
    let nickname = required("nickname", nickname)?;
    let about = required("aboutme", aboutme)?;
    let website = normalize_website(&required("website", website)?);

    let mut pfp = users::avatar_of(&state.db, user.id).await?;
    let mut notice: Option<&str> = None;
    match upload {
        None => notice = Some("No file part"),
        Some(u) if u.filename.is_empty() => {
            return Ok(view::render(&state, &ctx, Page::new(EDIT_TEMPLATE).flash("No selected file")));
        }
        Some(u) if allowed_file(&u.filename) => {
            let stored = store_avatar(&state.upload_dir, user.id, &u).await?;
            pfp = Some(format!("{}{}", AVATAR_WEB_PREFIX, stored));
        }
        Some(u) => {
            warn!(user_id = user.id, filename = %u.filename, "avatar rejected: extension not allowed");
            notice = Some("File type not allowed.");
        }
    }

    let upd = ProfileUpdate { nickname, website, about, pfp };
    users::update_profile(&state.db, user.id, &upd).await?;
    info!(user_id = user.id, "profile updated");

    match notice {
        Some(msg) => Ok(view::flash_and_redirect(&state, &ctx, msg, FEED_PATH)),
        None => Ok(Redirect::to(FEED_PATH).into_response()),
    }
}
