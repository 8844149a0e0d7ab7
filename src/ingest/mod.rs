// Ingestion: network receive loop, wire decoding and the per-slot mailboxes
// shared between the receive thread and the consumer.
pub mod packet;
pub mod slot_store;
pub mod receiver;
pub mod diagnostics;
