//! # herald-publisher
//!
//! Single-event publishers on a shared synchronous bus.
//!
//! A cycle runs the publisher's hooks, fans the arguments out to every live
//! listener in registration order, collects the deferred results they return
//! and forwards one normalized outcome to the "completed" or "failed" child
//! publisher.
//!
//! ```no_run
//! use herald_core::Reply;
//! use herald_publisher::Hub;
//! use serde_json::{json, Value};
//!
//! # async fn demo() -> Result<(), herald_core::HeraldError> {
//! let hub = Hub::new()?;
//! let orders = hub.publisher("orders").with_children().build();
//! orders.listen(|args: &[Value]| Reply::resolved(args[0].clone()));
//! orders.trigger(vec![json!(5)])?;
//! orders.flush().await?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod cycle;
pub mod publisher;
pub mod registry;
pub mod resolver;
pub mod turn;

pub use bus::{EventBus, Handler};
pub use cycle::Emission;
pub use publisher::{Hub, Outcomes, Publisher, PublisherBuilder};
pub use registry::{CycleFrame, DispatchRecord, Subscription};
pub use resolver::Continuation;
pub use turn::TurnQueue;
