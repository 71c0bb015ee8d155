/// Client instructions parsed from form body values
///
/// Everything here is parsed into tagged values before any remote call is
/// made, so execution code never looks at raw strings.
use tracing::warn;

/// Instruction for a single-asset field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionToken {
    #[default]
    None,
    /// Clear pending UI state; the stored asset is untouched
    ResetField,
    /// Detach the asset from the record, leaving the remote object in place
    RemoveAsset,
    /// Destroy the remote object and empty the record
    DeleteAsset,
}

impl ActionToken {
    /// Parse the `<field>_action` value; unknown values mean no action
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => ActionToken::None,
            Some("reset") => ActionToken::ResetField,
            Some("remove") => ActionToken::RemoveAsset,
            Some("delete") => ActionToken::DeleteAsset,
            Some(other) => {
                warn!("Ignoring unknown asset action {:?}", other);
                ActionToken::None
            }
        }
    }
}

/// What to do with a marked list item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerMethod {
    /// Splice out of the list only
    Remove,
    /// Destroy remotely, then splice out
    Delete,
}

/// One `method:id,id` group of a list action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalMarker {
    pub method: MarkerMethod,
    pub ids: Vec<String>,
}

/// Parse `method:id,id|method:id,...`, dropping malformed groups
pub fn parse_markers(value: Option<&str>) -> Vec<RemovalMarker> {
    let Some(value) = value else {
        return Vec::new();
    };

    value
        .split('|')
        .filter_map(|group| {
            let (method, ids) = group.split_once(':')?;
            let method = match method.trim() {
                "remove" => MarkerMethod::Remove,
                "delete" => MarkerMethod::Delete,
                other => {
                    warn!("Ignoring list action with unknown method {:?}", other);
                    return None;
                }
            };
            let ids: Vec<String> = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect();
            if ids.is_empty() {
                return None;
            }
            Some(RemovalMarker { method, ids })
        })
        .collect()
}

/// Parse the comma-separated order key
pub fn parse_order(value: Option<&str>) -> Option<Vec<String>> {
    let ids: Vec<String> = value?
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect();
    Some(ids).filter(|ids| !ids.is_empty())
}
