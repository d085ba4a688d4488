// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! DDP protocol: message model, wire codec, session state machine and the
//! async transport client.

pub mod auth;
pub mod client;
pub mod codec;
pub mod collections;
pub mod endpoint;
pub mod message;
pub mod session;

pub use auth::{login_message, password_parameter, Credentials};
pub use client::{ClientConfig, DdpClient};
pub use collections::{CollectionSnapshot, Document};
pub use message::{Message, MessageKind};
pub use session::{ClientEvent, ConnectionState, IdAllocator, Session, SessionOptions};
