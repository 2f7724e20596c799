// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `yesod_vm` live in `benches/`.
