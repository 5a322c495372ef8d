//! Classroom monitoring library: frame analysis and attendance accrual.
//!
//! The pipeline consists of:
//! 1. Heuristic feature scoring over RGBA pixel regions (skin tone, screen
//!    brightness, edges, mouth and eye contrast)
//! 2. Sliding-window scanning for faces, phones and talking
//! 3. Identity matching of faces to the class roster, and attribution of
//!    behaviors to the faces of the previous cycle
//! 4. Attendance accrual per student and finalization when the class ends
//!
//! Storage and warnings go through the collaborator traits in [`store`];
//! [`store::InMemoryStore`] implements all of them.
//!
//! # Examples
//!
//! ## Single detection cycle
//!
//! ```no_run
//! use classroom_monitor::config::Config;
//! use classroom_monitor::model::ClassSession;
//! use classroom_monitor::session::DetectionSession;
//! use classroom_monitor::utils::image_conversion::load_frame;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let class = ClassSession::new(1, "Chemistry", 45.0);
//! let mut session = DetectionSession::from_config(class, &config, None)?;
//!
//! let frame = load_frame("classroom.png")?;
//! let outcome = session.analyze(&frame)?;
//! for face in &outcome.faces {
//!     println!("face at ({:.0}, {:.0}) confidence {:.1}", face.bbox.x, face.bbox.y, face.confidence);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Monitoring a class
//!
//! ```no_run
//! use classroom_monitor::attendance::AttendancePolicy;
//! use classroom_monitor::config::Config;
//! use classroom_monitor::frame::StaticFrameSource;
//! use classroom_monitor::lifecycle::SessionManager;
//! use classroom_monitor::model::ClassSession;
//! use classroom_monitor::monitor::Monitor;
//! use classroom_monitor::store::InMemoryStore;
//! use classroom_monitor::utils::image_conversion::load_frame;
//! use chrono::Utc;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let store = Arc::new(InMemoryStore::new());
//! store.add_class(ClassSession::new(1, "Chemistry", 45.0))?;
//! let manager = SessionManager::new(store.clone(), AttendancePolicy::default());
//!
//! manager.start_class(1, Utc::now()).await?;
//! let session = manager.open_session(1, &config, None)?;
//!
//! let mut monitor = Monitor::new();
//! let source = Box::new(StaticFrameSource::new(load_frame("classroom.png")?));
//! monitor.start(session, source, store.clone(), config.sample_interval())?;
//! // ... class runs ...
//! if let Some(mut session) = monitor.stop().await? {
//!     session.dispose();
//! }
//!
//! let records = manager.end_class(1, Utc::now()).await?;
//! println!("{} attendance records", records.len());
//! # Ok(())
//! # }
//! ```

/// Error types and result handling
pub mod error;

/// Heuristic thresholds, weights and window sizes
pub mod constants;

/// Configuration management
pub mod config;

/// Pixel buffers, regions and frame sources
pub mod frame;

/// Feature scoring over frame regions
pub mod scoring;

/// Sliding-window region scanning
pub mod scanner;

/// Domain entities
pub mod model;

/// Identity matching for faces and behaviors
pub mod matcher;

/// Attendance accrual and finalization
pub mod attendance;

/// Collaborator traits and the in-memory store
pub mod store;

/// Class session lifecycle with per-class serialization
pub mod lifecycle;

/// Session-scoped detection state
pub mod session;

/// Cancellable periodic detection loop
pub mod monitor;

/// Utility functions for coordinates, annotation and image files
pub mod utils;

pub use error::{Error, Result};
