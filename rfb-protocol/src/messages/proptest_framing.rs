//! Property tests for message framing.
//!
//! These tests verify that the state machine is robust against fragmentation
//! at arbitrary byte boundaries: a server transcript delivered in pieces must
//! leave the session in exactly the state reached when it arrives whole.
