//! Transaction log test suite

mod replay_tests;
