//! Edit script parsing.

use log::debug;
use serde::Deserialize;
use thiserror::Error;

use tandem::{TandemError, adjust::ElementBounds, command::Operation, derive::DiagramKind};

/// Script-related errors for CLI
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to parse edit script: {0}")]
    Parse(String),

    #[error("Step {index}: missing `op` key")]
    MissingOp { index: usize },

    #[error("Step {index} (`{op}`): {message}")]
    InvalidStep {
        index: usize,
        op: String,
        message: String,
    },
}

impl From<ScriptError> for TandemError {
    fn from(err: ScriptError) -> Self {
        TandemError::InvalidOperation(err.to_string())
    }
}

/// One step of an edit script.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// An edit executed as one compound command.
    Edit(Operation),
    /// Client-measured bounds, applied against `revision` or the current one.
    Measure {
        bounds: Vec<ElementBounds>,
        revision: Option<u64>,
    },
    Undo,
    Redo,
}

impl Step {
    /// The step's `op` name.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Edit(operation) => operation_name(operation),
            Step::Measure { .. } => "measure",
            Step::Undo => "undo",
            Step::Redo => "redo",
        }
    }
}

fn operation_name(operation: &Operation) -> &'static str {
    match operation {
        Operation::AddElement { .. } => "add_element",
        Operation::AddRelationship { .. } => "add_relationship",
        Operation::AddCommentEdge { .. } => "add_comment_edge",
        Operation::Remove { .. } => "remove",
        Operation::Delete { .. } => "delete",
        Operation::RemoveCommentEdge { .. } => "remove_comment_edge",
        Operation::SetName { .. } => "set_name",
        Operation::ChangeBounds { .. } => "change_bounds",
        Operation::Reroute { .. } => "reroute",
    }
}

#[derive(Deserialize)]
struct RawScript {
    uri: String,
    #[serde(default)]
    diagram: DiagramKind,
    #[serde(default)]
    steps: Vec<toml::Table>,
}

#[derive(Deserialize)]
struct MeasureStep {
    bounds: Vec<ElementBounds>,
    #[serde(default)]
    revision: Option<u64>,
}

/// A parsed edit script.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    uri: String,
    diagram: DiagramKind,
    steps: Vec<Step>,
}

impl Script {
    /// Parse a script from TOML source.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first malformed step.
    pub fn parse(source: &str) -> Result<Self, ScriptError> {
        let raw: RawScript = toml::from_str(source).map_err(|e| ScriptError::Parse(e.to_string()))?;
        let steps = raw
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, table)| parse_step(index + 1, table))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(uri = raw.uri.as_str(), diagram:? = raw.diagram, steps = steps.len(); "Parsed edit script");

        Ok(Self {
            uri: raw.uri,
            diagram: raw.diagram,
            steps,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn diagram(&self) -> DiagramKind {
        self.diagram
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

fn parse_step(index: usize, table: toml::Table) -> Result<Step, ScriptError> {
    let op = table
        .get("op")
        .and_then(toml::Value::as_str)
        .ok_or(ScriptError::MissingOp { index })?
        .to_string();
    let invalid = |message: String| ScriptError::InvalidStep {
        index,
        op: op.clone(),
        message,
    };

    match op.as_str() {
        "measure" => {
            let measure: MeasureStep = toml::Value::Table(table)
                .try_into()
                .map_err(|e| invalid(e.to_string()))?;
            Ok(Step::Measure {
                bounds: measure.bounds,
                revision: measure.revision,
            })
        }
        "undo" => Ok(Step::Undo),
        "redo" => Ok(Step::Redo),
        _ => toml::Value::Table(table)
            .try_into()
            .map(Step::Edit)
            .map_err(|e| invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use tandem::{
        geometry::{Point, Size},
        identifier::Id,
        semantic::ElementKind,
    };

    use super::*;

    #[test]
    fn test_parse_script() {
        let script = Script::parse(
            r#"
            uri = "mem://shop.uml"
            diagram = "class"

            [[steps]]
            op = "add_element"
            kind = "class"
            position = { x = 10.0, y = 20.0 }
            name = "Order"

            [[steps]]
            op = "measure"
            revision = 1
            bounds = [{ id = "shop::class_1", size = { width = 80.0, height = 40.0 } }]

            [[steps]]
            op = "undo"
            "#,
        )
        .unwrap();

        assert_eq!(script.uri(), "mem://shop.uml");
        assert_eq!(script.diagram(), DiagramKind::Class);
        assert_eq!(
            script.steps(),
            &[
                Step::Edit(Operation::AddElement {
                    kind: ElementKind::Class,
                    position: Point::new(10.0, 20.0),
                    parent: None,
                    name: Some("Order".to_string()),
                }),
                Step::Measure {
                    bounds: vec![ElementBounds::new(
                        Id::new("shop::class_1"),
                        Size::new(80.0, 40.0)
                    )],
                    revision: Some(1),
                },
                Step::Undo,
            ]
        );
    }

    #[test]
    fn test_diagram_defaults_to_use_case() {
        let script = Script::parse(r#"uri = "mem://empty.uml""#).unwrap();
        assert_eq!(script.diagram(), DiagramKind::UseCase);
        assert!(script.steps().is_empty());
    }

    #[test]
    fn test_unknown_op_is_reported_with_its_step() {
        let err = Script::parse(
            r#"
            uri = "mem://shop.uml"

            [[steps]]
            op = "undo"

            [[steps]]
            op = "paint"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ScriptError::InvalidStep { index: 2, ref op, .. } if op == "paint"));
    }

    #[test]
    fn test_missing_op() {
        let err = Script::parse(
            r#"
            uri = "mem://shop.uml"

            [[steps]]
            kind = "actor"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ScriptError::MissingOp { index: 1 }));
    }
}
