// This file is part of explorer-sync.
// Copyright (C) 2025 Kodebox
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::error::Error as StdError;

/// Alias for `async` and `anyhow` friendly dynamic errors.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Extension methods for types implementing `std::error::Error`.
pub trait StdErrorExt
where
    Self: StdError,
{
    /// Format this error and all of its recursive sources as a chain of colon separated strings,
    /// e.g. for logging: `error!(error = error.as_chain(); "cannot sync")`.
    fn as_chain(&self) -> String {
        let mut chain = self.to_string();

        let mut source = self.source();
        while let Some(s) = source {
            chain.push_str(": ");
            chain.push_str(&s.to_string());
            source = s.source();
        }

        chain
    }
}

impl<T> StdErrorExt for T where T: StdError + ?Sized {}

#[cfg(test)]
mod tests {
    use crate::error::StdErrorExt;
    use std::num::ParseIntError;
    use thiserror::Error;

    #[test]
    fn test_as_chain() {
        let height = "-1".parse::<u32>().map_err(ParseHeightError);
        assert_eq!(
            height.unwrap_err().as_chain(),
            "cannot parse height: invalid digit found in string"
        );

        let error = Outer(ParseHeightError("x".parse::<u32>().unwrap_err()));
        assert_eq!(
            error.as_chain(),
            "cannot load block: cannot parse height: invalid digit found in string"
        );
    }

    #[derive(Debug, Error)]
    #[error("cannot parse height")]
    struct ParseHeightError(#[source] ParseIntError);

    #[derive(Debug, Error)]
    #[error("cannot load block")]
    struct Outer(#[source] ParseHeightError);
}
