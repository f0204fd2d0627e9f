// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Generates `COMMIT_ID` and `BUILD_REL_DATE` for `gst::plugin_define!`.

fn main() {
    gst_plugin_version_helper::info()
}
