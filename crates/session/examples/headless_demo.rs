//! Headless session demonstration
//!
//! Runs a toy computation engine on the host thread, draws into the
//! in-memory backend and drags a point around. Pass a config file path as
//! the first argument to override the defaults.

use mathboard_config::MathboardConfig;
use mathboard_rpc::{EngineHost, MathEngine};
use mathboard_scene::MemoryBackend;
use mathboard_session::Session;
use mathboard_shared::events::{ElementState, MouseButton, PhysicalPosition, WindowEvent};
use mathboard_shared::{Command, ElementId, Intent, RequestKind};
use serde_json::{json, Value};

/// Understands circles and nothing else
struct ToyEngine;

impl MathEngine for ToyEngine {
    fn execute(&mut self, kind: RequestKind, payload: &Value) -> Result<Value, String> {
        if kind != RequestKind::Geometry || payload["intent"] != "draw_circle" {
            return Ok(json!({ "success": false, "error": format!("{kind} is not supported here") }));
        }
        let data = &payload["data"];
        Ok(json!({
            "success": true,
            "elements": [
                { "id": "O", "type": "point", "parents": data["center"].clone(), "props": { "name": "O" } },
                { "id": "k", "type": "circle", "parents": ["O", data["radius"].clone()] }
            ],
            "explanation": "A circle around O"
        }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => MathboardConfig::load(path)?,
        None => MathboardConfig::default(),
    };

    let host = EngineHost::new(|| Ok(Box::new(ToyEngine) as Box<dyn MathEngine>))
        .with_thread_name("mathboard-demo-host");
    let mut session = Session::from_config(host, MemoryBackend::default(), &config)?;
    session.start().await?;
    println!("Host status: {:?}", session.status().phase);

    let circle = Command::new(Intent::DrawCircle {
        center: [0.0, 0.0],
        radius: 3.0,
    })?;
    let report = session.execute(&circle).await?;
    println!("Created: {:?}", report.created);
    println!("Explanation: {:?}", session.explanation());

    let failed = session
        .execute(&Command::new(Intent::Calculate {
            expression: "1 / 0".to_string(),
        })?)
        .await?;
    println!("Failed command touched the scene: {}", !failed.is_noop());
    for error in session.errors() {
        println!("Inline error: {}", error.message);
    }

    // Drag O one unit to the right
    let viewport = config.viewport;
    let (cx, cy) = (viewport.width as f64 / 2.0, viewport.height as f64 / 2.0);
    let unit = viewport.width as f64 / (viewport.bounding_box[2] - viewport.bounding_box[0]);
    for event in [
        WindowEvent::CursorMoved {
            position: PhysicalPosition::new(cx, cy),
        },
        WindowEvent::MouseInput {
            state: ElementState::Pressed,
            button: MouseButton::Left,
        },
        WindowEvent::CursorMoved {
            position: PhysicalPosition::new(cx + unit, cy),
        },
        WindowEvent::MouseInput {
            state: ElementState::Released,
            button: MouseButton::Left,
        },
    ] {
        if let Some(report) = session.handle_event(event)? {
            println!("Drag committed, live objects rebuilt: {}", !report.is_noop());
        }
    }

    let center = session.model().get(&ElementId::from("O"));
    println!("O is now at {:?}", center.and_then(|e| e.point_position()));

    let report = session.delete(&ElementId::from("O"))?;
    println!("Deleted: {:?}", report.removed);

    if let Err(e) = session.delete(&ElementId::from("O")) {
        println!("Second delete: {}", e.into_response("delete").to_json());
    }

    session.shutdown();
    Ok(())
}
