//! Delivery side of Courier.
//!
//! Claims due payloads from the delay queue, reports each notification as
//! complete to the API and fans it out to the chat and email channels.

pub mod channels;
pub mod dispatch;
pub mod reporter;
pub mod shutdown;
pub mod source;
