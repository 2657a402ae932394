use crate::error::{TfResult, TrackForgeError};
use crate::weights::{NormFactors, WeightVector};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// One tracking task from the template, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEntry {
    pub name: String,
    pub weight: f64,
}

/// A tracking task-set document (`<CMC_TaskSet>`) used as the template every
/// candidate's weights are written into.
///
/// A task is any element carrying a `name` attribute with a direct `<weight>`
/// child. Only the first component of each `<weight>` is tuned; the rest of
/// the document is reproduced as-is.
#[derive(Debug, Clone)]
pub struct TaskSet {
    xml: String,
    tasks: Vec<TaskEntry>,
}

impl TaskSet {
    pub fn load<P: AsRef<Path>>(path: P) -> TfResult<Self> {
        let path = path.as_ref();
        info!("📂 Reading tracking tasks from {}", path.display());
        let xml = fs::read_to_string(path).map_err(|e| {
            TrackForgeError::Config(format!(
                "Could not open task template '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(xml)
    }

    pub fn parse(xml: String) -> TfResult<Self> {
        let mut tasks = Vec::new();
        walk_weights(&xml, |task, text| {
            let weight = first_component(text).ok_or_else(|| {
                TrackForgeError::Validation(format!(
                    "Task '{}' has an unreadable weight '{}'",
                    task,
                    text.trim()
                ))
            })?;
            tasks.push(TaskEntry {
                name: task.to_string(),
                weight,
            });
            Ok(None)
        })?;

        if tasks.is_empty() {
            return Err(TrackForgeError::Validation(
                "Task template contains no weighted tasks".to_string(),
            ));
        }
        debug!("Template holds {} tracking tasks", tasks.len());
        Ok(Self { xml, tasks })
    }

    pub fn tasks(&self) -> &[TaskEntry] {
        &self.tasks
    }

    pub fn initial_weights(&self, norm: &NormFactors) -> TfResult<WeightVector> {
        let names = self.tasks.iter().map(|t| t.name.clone()).collect();
        let values = self.tasks.iter().map(|t| t.weight).collect();
        WeightVector::new(names, values, norm)
    }

    /// The template document with each task's primary weight replaced by the
    /// value in `weights`. Tasks `weights` does not name keep their weight.
    pub fn render(&self, weights: &WeightVector) -> TfResult<String> {
        let lookup: HashMap<&str, f64> = weights
            .names()
            .iter()
            .map(String::as_str)
            .zip(weights.values().iter().copied())
            .collect();

        let out = walk_weights(&self.xml, |task, text| {
            Ok(lookup
                .get(task)
                .map(|&w| replace_first_component(text, w)))
        })?;
        Ok(out)
    }

    pub fn write<P: AsRef<Path>>(&self, weights: &WeightVector, path: P) -> TfResult<()> {
        let rendered = self.render(weights)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

/// Streams `xml` through a writer. For the text of every task's `<weight>`
/// element, `on_weight(task_name, text)` may return replacement text.
fn walk_weights<F>(xml: &str, mut on_weight: F) -> TfResult<String>
where
    F: FnMut(&str, &str) -> TfResult<Option<String>>,
{
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    // Name attribute (if any) of every open element
    let mut stack: Vec<Option<String>> = Vec::new();
    let mut weight_owner: Option<String> = None;
    // Entries under <defaults> are templates for the tool, not tasks
    let mut defaults_depth = 0usize;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(e) => {
                let tag = e.name();
                if tag.as_ref() == b"defaults" {
                    defaults_depth += 1;
                }
                if tag.as_ref() == b"weight" && defaults_depth == 0 {
                    weight_owner = stack.last().cloned().flatten();
                }
                let name = match e
                    .try_get_attribute("name")
                    .map_err(quick_xml::Error::from)?
                {
                    Some(attr) => Some(
                        attr.unescape_value()
                            .map_err(quick_xml::Error::from)?
                            .into_owned(),
                    ),
                    None => None,
                };
                stack.push(name);
            }
            Event::End(e) => {
                match e.name().as_ref() {
                    b"weight" => weight_owner = None,
                    b"defaults" => defaults_depth = defaults_depth.saturating_sub(1),
                    _ => {}
                }
                stack.pop();
            }
            Event::Text(t) => {
                if let Some(task) = weight_owner.as_deref() {
                    let text = t.unescape().map_err(quick_xml::Error::from)?;
                    if let Some(new_text) = on_weight(task, &text)? {
                        writer.write_event(Event::Text(BytesText::new(&new_text)))?;
                        continue;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        writer.write_event(event)?;
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| TrackForgeError::Validation(format!("Task set is not UTF-8: {}", e)))
}

fn first_component(text: &str) -> Option<f64> {
    text.split_whitespace().next()?.parse().ok()
}

fn replace_first_component(text: &str, value: f64) -> String {
    let mut parts: Vec<Cow<str>> = text.split_whitespace().map(Cow::Borrowed).collect();
    let rendered = Cow::Owned(format!("{}", value));
    if parts.is_empty() {
        parts.push(rendered);
    } else {
        parts[0] = rendered;
    }
    parts.join(" ")
}
