// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed translation-unit header emitted ahead of every synthesized
//! block unit.
//!
//! Bit-exact reproduction is not load-bearing — what matters is that the
//! worker, built against the same convention, can resolve the emitted
//! `Export_block_*` symbol. The import set here is deliberately generous;
//! [`crate::pruner::prune_imports`] strips whatever the block didn't end
//! up using.

pub const PREAMBLE: &str = r#"package main

import (
	"errors"
	"fmt"
	"math"
	"os"
	"strconv"
	"strings"
	"time"
)

"#;

#[cfg(test)]
#[path = "preamble_tests.rs"]
mod tests;
