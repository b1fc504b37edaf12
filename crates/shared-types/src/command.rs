//! Commands for the computation host
//!
//! On the wire a command is `{ intent, data, explanation? }` with an untyped
//! `data` mapping. Inside the workspace it is a [`Command`] whose intent is a
//! tagged union with one strongly-typed variant per intent, validated once at
//! the boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Request kinds understood by the computation host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Init,
    Convert,
    Process,
    Differentiate,
    Integrate,
    Geometry,
    Calculate,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestKind::Init => "init",
            RequestKind::Convert => "convert",
            RequestKind::Process => "process",
            RequestKind::Differentiate => "differentiate",
            RequestKind::Integrate => "integrate",
            RequestKind::Geometry => "geometry",
            RequestKind::Calculate => "calculate",
        };
        f.write_str(name)
    }
}

/// Command validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Unknown or malformed intent '{intent}': {message}")]
    Malformed { intent: String, message: String },

    #[error("Invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

fn default_order() -> u32 {
    1
}

/// One variant per supported intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "data", rename_all = "snake_case")]
pub enum Intent {
    PlotFunction {
        expressions: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        colors: Vec<String>,
    },
    PlotDerivative {
        expression: String,
        #[serde(default = "default_order")]
        order: u32,
    },
    PlotIntegral {
        expression: String,
    },
    SolveAndPlot {
        expression: String,
    },
    FindExtrema {
        expression: String,
    },
    Convert {
        expression: String,
    },
    Calculate {
        expression: String,
    },
    DrawPoint {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    DrawSegment {
        from: [f64; 2],
        to: [f64; 2],
    },
    DrawCircle {
        center: [f64; 2],
        radius: f64,
    },
    DrawPolygon {
        vertices: Vec<[f64; 2]>,
    },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::PlotFunction { .. } => "plot_function",
            Intent::PlotDerivative { .. } => "plot_derivative",
            Intent::PlotIntegral { .. } => "plot_integral",
            Intent::SolveAndPlot { .. } => "solve_and_plot",
            Intent::FindExtrema { .. } => "find_extrema",
            Intent::Convert { .. } => "convert",
            Intent::Calculate { .. } => "calculate",
            Intent::DrawPoint { .. } => "draw_point",
            Intent::DrawSegment { .. } => "draw_segment",
            Intent::DrawCircle { .. } => "draw_circle",
            Intent::DrawPolygon { .. } => "draw_polygon",
        }
    }

    /// Host request kind that executes this intent.
    pub fn request_kind(&self) -> RequestKind {
        match self {
            Intent::PlotFunction { .. }
            | Intent::SolveAndPlot { .. }
            | Intent::FindExtrema { .. } => RequestKind::Process,
            Intent::PlotDerivative { .. } => RequestKind::Differentiate,
            Intent::PlotIntegral { .. } => RequestKind::Integrate,
            Intent::Convert { .. } => RequestKind::Convert,
            Intent::Calculate { .. } => RequestKind::Calculate,
            Intent::DrawPoint { .. }
            | Intent::DrawSegment { .. }
            | Intent::DrawCircle { .. }
            | Intent::DrawPolygon { .. } => RequestKind::Geometry,
        }
    }

    fn validate(&self) -> Result<(), CommandError> {
        match self {
            Intent::PlotFunction { expressions, .. } => {
                if expressions.is_empty() {
                    return Err(CommandError::Invalid {
                        field: "expressions",
                        message: "at least one expression is required".to_string(),
                    });
                }
                expressions.iter().try_for_each(|e| check_expression(e))
            }
            Intent::PlotDerivative { expression, order } => {
                check_expression(expression)?;
                if *order == 0 {
                    return Err(CommandError::Invalid {
                        field: "order",
                        message: "derivative order must be at least 1".to_string(),
                    });
                }
                Ok(())
            }
            Intent::PlotIntegral { expression }
            | Intent::SolveAndPlot { expression }
            | Intent::FindExtrema { expression }
            | Intent::Convert { expression }
            | Intent::Calculate { expression } => check_expression(expression),
            Intent::DrawPoint { x, y, .. } => check_coords("x/y", &[*x, *y]),
            Intent::DrawSegment { from, to } => {
                check_coords("from", from)?;
                check_coords("to", to)
            }
            Intent::DrawCircle { center, radius } => {
                check_coords("center", center)?;
                if !radius.is_finite() || *radius <= 0.0 {
                    return Err(CommandError::Invalid {
                        field: "radius",
                        message: format!("radius must be a positive number, got {radius}"),
                    });
                }
                Ok(())
            }
            Intent::DrawPolygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(CommandError::Invalid {
                        field: "vertices",
                        message: format!("a polygon needs 3 vertices, got {}", vertices.len()),
                    });
                }
                vertices.iter().try_for_each(|v| check_coords("vertices", v))
            }
        }
    }
}

fn check_expression(expression: &str) -> Result<(), CommandError> {
    if expression.trim().is_empty() {
        return Err(CommandError::Invalid {
            field: "expression",
            message: "expression cannot be empty".to_string(),
        });
    }
    Ok(())
}

fn check_coords(field: &'static str, coords: &[f64]) -> Result<(), CommandError> {
    if coords.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(CommandError::Invalid {
            field,
            message: format!("coordinates must be finite, got {coords:?}"),
        })
    }
}

/// Command exactly as it travels over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCommand {
    pub intent: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// A validated command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCommand", into = "RawCommand")]
pub struct Command {
    pub intent: Intent,
    pub explanation: Option<String>,
}

impl Command {
    pub fn new(intent: Intent) -> Result<Self, CommandError> {
        intent.validate()?;
        Ok(Self {
            intent,
            explanation: None,
        })
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn request_kind(&self) -> RequestKind {
        self.intent.request_kind()
    }
}

impl TryFrom<RawCommand> for Command {
    type Error = CommandError;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        let data = match raw.data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let tagged = serde_json::json!({ "intent": raw.intent, "data": data });
        let intent: Intent =
            serde_json::from_value(tagged).map_err(|e| CommandError::Malformed {
                intent: raw.intent.clone(),
                message: e.to_string(),
            })?;
        intent.validate()?;

        Ok(Self {
            intent,
            explanation: raw.explanation,
        })
    }
}

impl From<Command> for RawCommand {
    fn from(command: Command) -> Self {
        let name = command.intent.name().to_string();
        let data = serde_json::to_value(&command.intent)
            .ok()
            .and_then(|mut v| v.get_mut("data").map(Value::take))
            .unwrap_or(Value::Object(Default::default()));

        RawCommand {
            intent: name,
            data,
            explanation: command.explanation,
        }
    }
}
