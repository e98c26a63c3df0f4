//! Settings-block inspection and schema migration.
//!
//! The settings block is a user-editable toggle holding one `Label: value`
//! line per recognized field. Because the page is hand-editable, the block
//! may be missing entirely or carry an older field set; reconciliation is
//! modeled as an explicit three-state machine rather than a chain of calls.
//!
//! The stale path is delete-then-create and is not atomic: a failure
//! between the two calls leaves the settings block absent until the next
//! run re-creates it.

use crate::config::{parse_settings_text, Config, PartialConfig};
use crate::scan::BlockSource;
use notion::NewBlock;
use tracing::info;

/// Marker the settings container's own text must carry.
pub const SETTINGS_MARKER: &str = "Settings";

/// The full recognized field set, in creation order.
pub const FIELD_LABELS: [&str; 5] = ["Name", "Birthday", "Breed", "Weight", "Vet Contact"];

/// Field present in the current schema but not the old one; its presence
/// marks a settings block as current.
pub const SENTINEL_LABEL: &str = "Vet Contact";

/// Where the settings block stands relative to the current schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsState {
    /// No settings block exists on the page.
    Absent,
    /// A settings block exists but carries the old field set.
    Stale { block_id: String },
    /// A settings block exists with the full field set.
    Current { block_id: String },
}

/// Mutation seam for reconciliation. The real client issues the network
/// calls; tests record the action sequence instead.
#[allow(async_fn_in_trait)]
pub trait BlockSink {
    async fn append(
        &self,
        parent_id: &str,
        children: &[NewBlock],
    ) -> Result<Vec<notion::Block>, notion::Error>;
    async fn delete(&self, block_id: &str) -> Result<(), notion::Error>;
}

impl BlockSink for notion::Notion {
    async fn append(
        &self,
        parent_id: &str,
        children: &[NewBlock],
    ) -> Result<Vec<notion::Block>, notion::Error> {
        self.append_children(parent_id, children).await
    }

    async fn delete(&self, block_id: &str) -> Result<(), notion::Error> {
        self.delete_block(block_id).await
    }
}

/// Classify a settings block by its combined text (own lines plus child
/// lines): the sentinel field present means the schema is current.
pub fn classify(block_id: Option<&str>, combined_text: &str) -> SettingsState {
    let Some(block_id) = block_id else {
        return SettingsState::Absent;
    };
    let sentinel = format!("{SENTINEL_LABEL}:");
    if combined_text.contains(&sentinel) {
        SettingsState::Current {
            block_id: block_id.to_string(),
        }
    } else {
        SettingsState::Stale {
            block_id: block_id.to_string(),
        }
    }
}

/// Read a discovered settings block: its state and its config layer.
///
/// The layer is parsed from the block's own text and, when it is a
/// container, the text of its direct children.
pub async fn inspect<S: BlockSource>(
    source: &S,
    settings_id: Option<&str>,
) -> Result<(SettingsState, PartialConfig), notion::Error> {
    let Some(settings_id) = settings_id else {
        return Ok((SettingsState::Absent, PartialConfig::default()));
    };

    let container = source.block(settings_id).await?;
    let mut text = container.plain_text.clone();
    if container.has_children {
        for child in source.children_of(settings_id).await? {
            text.push('\n');
            text.push_str(&child.plain_text);
        }
    }

    Ok((
        classify(Some(settings_id), &text),
        parse_settings_text(&text),
    ))
}

/// Bring the settings block up to the current schema.
///
/// Absent: create it under the page, seeded from the resolved config.
/// Stale: delete, then recreate (the documented non-atomic window).
/// Current: idempotent no-op.
pub async fn reconcile<K: BlockSink>(
    sink: &K,
    page_id: &str,
    state: &SettingsState,
    resolved: &Config,
) -> Result<(), notion::Error> {
    match state {
        SettingsState::Current { .. } => Ok(()),
        SettingsState::Absent => {
            info!("settings block missing, creating with current schema");
            sink.append(page_id, &[seed_block(resolved)]).await?;
            Ok(())
        }
        SettingsState::Stale { block_id } => {
            info!(block = %block_id, "settings schema stale, recreating");
            sink.delete(block_id).await?;
            sink.append(page_id, &[seed_block(resolved)]).await?;
            Ok(())
        }
    }
}

/// The replacement settings toggle, seeded with resolved name/birthday and
/// empty placeholders for the remaining fields.
pub fn seed_block(resolved: &Config) -> NewBlock {
    let fields = FIELD_LABELS
        .iter()
        .map(|label| {
            let value = match *label {
                "Name" => resolved.pet_name.clone(),
                "Birthday" => resolved.birth_date.format("%Y-%m-%d").to_string(),
                _ => String::new(),
            };
            NewBlock::paragraph(format!("{label}: {value}"))
        })
        .collect();
    NewBlock::toggle(format!("⚙️ {SETTINGS_MARKER}"), fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::testing::TreeSource;

    fn resolved() -> Config {
        config::resolve([])
    }

    #[test]
    fn test_classify_states() {
        assert_eq!(classify(None, ""), SettingsState::Absent);
        assert_eq!(
            classify(Some("s1"), "Name: Milk\nBirthday: 2013-09-30"),
            SettingsState::Stale {
                block_id: "s1".to_string()
            }
        );
        assert_eq!(
            classify(Some("s1"), "Name: Milk\nVet Contact: 555-0199"),
            SettingsState::Current {
                block_id: "s1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_inspect_reads_container_and_children() {
        let mut tree = TreeSource::new();
        tree.add("page", "s1", "toggle", "⚙️ Settings", true);
        tree.add("s1", "f1", "paragraph", "Name: Latte", false);
        tree.add("s1", "f2", "paragraph", "Vet Contact: 555-0199", false);

        let (state, layer) = inspect(&tree, Some("s1")).await.unwrap();
        assert_eq!(
            state,
            SettingsState::Current {
                block_id: "s1".to_string()
            }
        );
        assert_eq!(layer.pet_name.as_deref(), Some("Latte"));
        assert_eq!(layer.vet_contact.as_deref(), Some("555-0199"));
    }

    #[tokio::test]
    async fn test_inspect_direct_text_block() {
        // Settings held in a single paragraph's own lines, no children.
        let mut tree = TreeSource::new();
        tree.add(
            "page",
            "s1",
            "paragraph",
            "Settings\nName: Mochi\nBirthday: 2019-11-03",
            false,
        );

        let (state, layer) = inspect(&tree, Some("s1")).await.unwrap();
        assert_eq!(
            state,
            SettingsState::Stale {
                block_id: "s1".to_string()
            }
        );
        assert_eq!(layer.pet_name.as_deref(), Some("Mochi"));
        assert_eq!(tree.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_current_is_noop() {
        let tree = TreeSource::new();
        let state = SettingsState::Current {
            block_id: "s1".to_string(),
        };
        reconcile(&tree, "page", &state, &resolved()).await.unwrap();
        assert!(tree.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_absent_creates() {
        let tree = TreeSource::new();
        reconcile(&tree, "page", &SettingsState::Absent, &resolved())
            .await
            .unwrap();
        assert_eq!(tree.mutations(), vec!["append:page".to_string()]);
    }

    #[tokio::test]
    async fn test_reconcile_stale_deletes_then_creates() {
        let tree = TreeSource::new();
        let state = SettingsState::Stale {
            block_id: "s1".to_string(),
        };
        reconcile(&tree, "page", &state, &resolved()).await.unwrap();
        assert_eq!(
            tree.mutations(),
            vec!["delete:s1".to_string(), "append:page".to_string()]
        );
    }

    #[test]
    fn test_seed_block_covers_full_field_set() {
        let NewBlock::Toggle { text, children } = seed_block(&resolved()) else {
            panic!("seed block should be a toggle");
        };
        assert!(text.contains(SETTINGS_MARKER));
        assert_eq!(children.len(), FIELD_LABELS.len());

        let lines: Vec<String> = children
            .iter()
            .map(|child| match child {
                NewBlock::Paragraph { text } => text.clone(),
                other => panic!("unexpected field block: {other:?}"),
            })
            .collect();
        assert_eq!(lines[0], "Name: Milk");
        assert_eq!(lines[1], "Birthday: 2013-09-30");
        assert_eq!(lines[4], "Vet Contact: ");
    }
}
