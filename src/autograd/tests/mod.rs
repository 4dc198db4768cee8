//! Tests for autograd operations with gradient checking

mod unit_ops;
