//! `aichat works` -- print a page of a user's works.

use aichat_types::generation::KindFilter;

use crate::state::AppState;

pub async fn print_works(
    state: &AppState,
    owner: &str,
    kind: i64,
    page: u32,
    hide_personal_uploads: bool,
) -> anyhow::Result<()> {
    let kind = KindFilter::from_code(kind).map_err(anyhow::Error::msg)?;
    let works = state
        .generation
        .list_works(owner, kind, page, hide_personal_uploads)
        .await?;

    println!("{}", serde_json::to_string_pretty(&works)?);
    Ok(())
}
