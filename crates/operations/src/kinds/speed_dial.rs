use crate::fs;
use crate::operation::{Arity, Lifecycle, Operation, OperationState};
use crate::registry::OperationEnvironment;
use async_trait::async_trait;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rivet_config::constants::SPEED_DIAL_FILE;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const PREVIOUS: &str = "previous";
const PREVIOUS_ABSENT: &str = "previous_absent";
const WRITTEN: &str = "written";

/// One `<Kit>` entry of the speed-dial list
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KitEntry {
    pub id: String,
    pub path: String,
}

/// `AddKitsToSpeedDial <directory>`
///
/// Every subdirectory of `directory` holding a kit file contributes the
/// first such file. Known IDs get their path updated in place, new IDs are
/// appended.
#[derive(Debug, Clone)]
pub struct AddKitsToSpeedDial {
    state: OperationState,
    env: Arc<OperationEnvironment>,
}

impl AddKitsToSpeedDial {
    pub const NAME: &'static str = "AddKitsToSpeedDial";

    #[must_use]
    pub fn new(state: OperationState, env: Arc<OperationEnvironment>) -> Self {
        Self { state, env }
    }

    fn list_path(&self) -> PathBuf {
        self.env.speed_dial_dir.join(SPEED_DIAL_FILE)
    }

    /// First kit file of every subdirectory, in name order
    async fn scan(&self, source: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut kits = Vec::new();
        for dir in sorted_entries(source, true).await? {
            let files = sorted_entries(&dir, false).await?;
            if let Some(kit) = files.into_iter().find(|file| {
                file.extension().and_then(|e| e.to_str()) == Some(self.env.kit_extension.as_str())
            }) {
                kits.push(kit);
            }
        }
        Ok(kits)
    }
}

async fn sorted_entries(dir: &Path, directories: bool) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if (directories && file_type.is_dir()) || (!directories && file_type.is_file()) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Text of the first `<ID>` element of a kit file
pub(crate) fn read_kit_id(xml: &str) -> Result<Option<String>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut in_id = false;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.name().as_ref() == b"ID" => in_id = true,
            Event::Text(t) if in_id => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                return Ok(Some(text.into_owned()));
            }
            Event::End(_) if in_id => return Ok(None),
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

pub(crate) fn parse_speed_dial(xml: &str) -> Result<Vec<KitEntry>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut kits = Vec::new();
    let mut current: Option<KitEntry> = None;
    let mut field: Option<Vec<u8>> = None;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if name == b"Kit" {
                    current = Some(KitEntry {
                        id: String::new(),
                        path: String::new(),
                    });
                } else {
                    field = Some(name);
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| e.to_string())?.into_owned();
                if let (Some(kit), Some(name)) = (current.as_mut(), field.as_deref()) {
                    match name {
                        b"ID" => kit.id = text,
                        b"Path" => kit.path = text,
                        _ => {}
                    }
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == b"Kit" {
                    if let Some(kit) = current.take() {
                        kits.push(kit);
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(kits)
}

pub(crate) fn render_speed_dial(kits: &[KitEntry]) -> Result<String, String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    let mut write = |event: Event<'_>| writer.write_event(event).map_err(|e| e.to_string());

    write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write(Event::Start(BytesStart::new("SpeedDialKits")))?;
    for kit in kits {
        write(Event::Start(BytesStart::new("Kit")))?;
        for (tag, text) in [("ID", &kit.id), ("Path", &kit.path)] {
            write(Event::Start(BytesStart::new(tag)))?;
            write(Event::Text(BytesText::new(text)))?;
            write(Event::End(BytesEnd::new(tag)))?;
        }
        write(Event::End(BytesEnd::new("Kit")))?;
    }
    write(Event::End(BytesEnd::new("SpeedDialKits")))?;

    let mut xml = String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())?;
    xml.push('\n');
    Ok(xml)
}

/// Update `kits` in place; returns whether the ID was new
pub(crate) fn upsert(kits: &mut Vec<KitEntry>, id: &str, path: &str) -> bool {
    if let Some(kit) = kits.iter_mut().find(|kit| kit.id == id) {
        kit.path = path.to_string();
        return false;
    }
    kits.push(KitEntry {
        id: id.to_string(),
        path: path.to_string(),
    });
    true
}

#[async_trait]
impl Operation for AddKitsToSpeedDial {
    fn state(&self) -> &OperationState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut OperationState {
        &mut self.state
    }

    fn arity(&self) -> Arity {
        Arity::Exactly(1)
    }

    async fn backup(&mut self) {
        let path = self.list_path();
        match fs::read_optional(&path).await {
            Ok(Some(previous)) => {
                self.state.set_value(PREVIOUS, previous);
                self.state.remove_value(PREVIOUS_ABSENT);
            }
            Ok(None) => {
                self.state.remove_value(PREVIOUS);
                self.state.set_value(PREVIOUS_ABSENT, "true");
            }
            Err(e) => debug!(
                path = %path.display(),
                error = %e,
                "speed dial list unreadable during backup"
            ),
        }
        self.state.set_lifecycle(Lifecycle::BackedUp);
    }

    async fn perform_operation(&mut self) -> bool {
        if !self.validate_arguments() {
            return false;
        }
        let source = PathBuf::from(self.state.argument(0).unwrap_or_default());
        let list_path = self.list_path();

        let kit_files = match self.scan(&source).await {
            Ok(files) => files,
            Err(e) => {
                self.state.fail(format!(
                    "Cannot read kit directory '{}': {e}",
                    source.display()
                ));
                return false;
            }
        };

        let mut kits = match fs::read_optional(&list_path).await {
            Ok(Some(xml)) => match parse_speed_dial(&xml) {
                Ok(kits) => kits,
                Err(e) => {
                    self.state.fail(format!(
                        "Cannot parse speed dial list '{}': {e}",
                        list_path.display()
                    ));
                    return false;
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                self.state.fail(format!(
                    "Cannot read speed dial list '{}': {e}",
                    list_path.display()
                ));
                return false;
            }
        };

        for kit_file in kit_files {
            let id = match tokio::fs::read_to_string(&kit_file).await {
                Ok(xml) => read_kit_id(&xml).ok().flatten(),
                Err(_) => None,
            };
            let Some(id) = id.filter(|id| !id.is_empty()) else {
                debug!(kit = %kit_file.display(), "kit file without ID skipped");
                continue;
            };
            let absolute = std::path::absolute(&kit_file).unwrap_or(kit_file);
            let added = upsert(&mut kits, &id, &absolute.to_string_lossy());
            debug!(id = %id, added, "speed dial entry");
        }

        let written = match render_speed_dial(&kits) {
            Ok(xml) => xml,
            Err(e) => {
                self.state.fail(format!(
                    "Cannot write speed dial list '{}': {e}",
                    list_path.display()
                ));
                return false;
            }
        };
        if let Err(e) = fs::write_atomic(&list_path, written.as_bytes()).await {
            self.state.fail(format!(
                "Cannot write speed dial list '{}': {e}",
                list_path.display()
            ));
            return false;
        }

        self.state.set_value(WRITTEN, written);
        self.state.set_lifecycle(Lifecycle::Performed);
        true
    }

    async fn undo_operation(&mut self) -> bool {
        let Some(written) = self.state.value(WRITTEN).map(str::to_string) else {
            self.state.set_lifecycle(Lifecycle::Undone);
            return true;
        };
        let list_path = self.list_path();
        let current = fs::read_optional(&list_path).await.ok().flatten();
        if current.as_deref() != Some(written.as_str()) {
            self.state.set_lifecycle(Lifecycle::Undone);
            return true;
        }

        let restored = match self.state.value(PREVIOUS) {
            Some(previous) => fs::write_atomic(&list_path, previous.as_bytes()).await,
            None if self.state.value(PREVIOUS_ABSENT).is_some() => {
                tokio::fs::remove_file(&list_path).await
            }
            None => Ok(()),
        };
        if let Err(e) = restored {
            self.state.fail(format!(
                "Cannot restore speed dial list '{}': {e}",
                list_path.display()
            ));
            return false;
        }
        self.state.remove_value(WRITTEN);
        self.state.set_lifecycle(Lifecycle::Undone);
        true
    }

    fn clone_fresh(&self) -> Box<dyn Operation> {
        Box::new(Self::new(self.state.fresh(), Arc::clone(&self.env)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_kit_id() {
        let xml = "<?xml version=\"1.0\"?><Kit><Name>Drums</Name><ID> abc-1 </ID></Kit>";
        assert_eq!(read_kit_id(xml).unwrap(), Some("abc-1".to_string()));
        assert_eq!(read_kit_id("<Kit><Name>x</Name></Kit>").unwrap(), None);
    }

    #[test]
    fn test_list_round_trip_with_escaping() {
        let kits = vec![
            KitEntry {
                id: "a".into(),
                path: "/kits/a&b.kit".into(),
            },
            KitEntry {
                id: "b".into(),
                path: "/kits/b.kit".into(),
            },
        ];
        let xml = render_speed_dial(&kits).unwrap();
        assert!(xml.contains("<SpeedDialKits>"));
        assert!(xml.contains("a&amp;b"));
        assert_eq!(parse_speed_dial(&xml).unwrap(), kits);
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let mut kits = vec![KitEntry {
            id: "a".into(),
            path: "/old".into(),
        }];
        assert!(!upsert(&mut kits, "a", "/new"));
        assert!(upsert(&mut kits, "b", "/b"));
        assert_eq!(kits.len(), 2);
        assert_eq!(kits[0].path, "/new");
    }
}
