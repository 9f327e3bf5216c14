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

use chrono::Utc;
use serde_with::DeserializeFromStr;
use std::{
    fmt::{self, Display},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep};

/// When to run recurring sync cycles: either a fixed interval like "5s" or a cron expression with
/// seconds like "*/5 * * * * *".
#[derive(Debug, Clone, DeserializeFromStr)]
pub enum Schedule {
    Interval(Duration),
    Cron(Box<cron::Schedule>),
}

impl Schedule {
    /// Create a [Ticker] yielding the instants of this schedule from now on.
    pub fn ticker(&self) -> Ticker {
        match self {
            Schedule::Interval(period) => {
                let mut interval = interval_at(Instant::now() + *period, *period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Ticker::Interval(interval)
            }

            Schedule::Cron(schedule) => Ticker::Cron(schedule.clone()),
        }
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Interval(period) => write!(f, "{}", humantime::format_duration(*period)),
            Schedule::Cron(schedule) => write!(f, "{schedule}"),
        }
    }
}

impl FromStr for Schedule {
    type Err = ParseScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        match humantime::parse_duration(s) {
            Ok(period) if period.is_zero() => Err(ParseScheduleError::ZeroInterval),
            Ok(period) => Ok(Schedule::Interval(period)),

            Err(_) => cron::Schedule::from_str(s)
                .map(|schedule| Schedule::Cron(Box::new(schedule)))
                .map_err(|error| ParseScheduleError::Cron(s.to_owned(), error)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseScheduleError {
    #[error("schedule interval must not be zero")]
    ZeroInterval,

    #[error("cannot parse schedule {0:?} as duration or cron expression")]
    Cron(String, #[source] cron::error::Error),
}

pub enum Ticker {
    Interval(Interval),
    Cron(Box<cron::Schedule>),
}

impl Ticker {
    /// Wait for the next instant of the schedule. Ticks missed because the caller was busy are
    /// skipped. Never completes if the schedule has no upcoming instant.
    pub async fn tick(&mut self) {
        match self {
            Ticker::Interval(interval) => {
                interval.tick().await;
            }

            Ticker::Cron(schedule) => {
                let next = schedule.upcoming(Utc).next();

                match next.and_then(|next| (next - Utc::now()).to_std().ok()) {
                    Some(delay) => sleep(delay).await,

                    // The next instant might have just passed while computing the delay.
                    None if next.is_some() => {}

                    None => std::future::pending().await,
                }
            }
        }
    }
}
