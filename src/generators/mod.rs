// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Output generators turning rendered markup into files.

/// Post-processing and writing of HTML pages.
pub mod html;
