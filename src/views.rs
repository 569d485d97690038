//! The four published measurements and their views.
//!
//! A [`Measure`] is the raw signal the sampler produces. A [`View`] pairs a measure with the
//! external metric name, a description and an aggregation. Hosts register the views with their
//! metrics pipeline before the first sample is taken, see
//! [`Recorder::register`](crate::Recorder::register).
//!
//! The external names are consumed by dashboards and alerts and must not change.

use std::fmt;

use crate::units::MetricUnit;

/// How the pipeline combines successive samples of a view.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Aggregation {
    /// Each sample overwrites the previous one.
    LastValue,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastValue => f.write_str("last_value"),
        }
    }
}

/// A raw signal with an internal name and a unit.
#[derive(Debug, Eq, PartialEq, Hash)]
pub struct Measure {
    /// Internal name of the measure.
    pub name: &'static str,
    /// Short description of what is measured.
    pub description: &'static str,
    /// Unit of the recorded values.
    pub unit: MetricUnit,
}

/// A measure as exposed to the metrics pipeline.
#[derive(Debug, Eq, PartialEq, Hash)]
pub struct View {
    /// External metric name.
    pub name: &'static str,
    /// Human readable description.
    pub description: &'static str,
    /// The measure this view aggregates.
    pub measure: &'static Measure,
    /// Aggregation hint for the pipeline.
    pub aggregation: Aggregation,
}

impl View {
    /// Unit of the underlying measure.
    pub fn unit(&self) -> MetricUnit {
        self.measure.unit
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {}]", self.name, self.unit(), self.aggregation)
    }
}

/// Number of tasks alive on the async runtime.
pub static TASK_COUNT: Measure = Measure {
    name: "num_tasks",
    description: "number of alive tasks",
    unit: MetricUnit::Dimensionless,
};

/// Live bytes allocated on the heap.
pub static HEAP_ALLOC: Measure = Measure {
    name: "heap_alloc",
    description: "bytes allocated",
    unit: MetricUnit::Bytes,
};

/// Bytes the allocator obtained from the operating system.
pub static HEAP_SYSTEM: Measure = Measure {
    name: "heap_sys",
    description: "bytes given by os",
    unit: MetricUnit::Bytes,
};

/// Duration of the most recent pause.
///
/// Values are nanoseconds even though the unit tag reads milliseconds; both are part of the
/// published contract.
pub static PAUSE_NS: Measure = Measure {
    name: "pause_ns",
    description: "nanoseconds of recent pause",
    unit: MetricUnit::Milliseconds,
};

/// View over [`TASK_COUNT`].
pub static TASK_COUNT_VIEW: View = View {
    name: "process/cpu_goroutines",
    description: "number of running tasks",
    measure: &TASK_COUNT,
    aggregation: Aggregation::LastValue,
};

/// View over [`HEAP_ALLOC`].
pub static HEAP_ALLOC_VIEW: View = View {
    name: "process/heap_alloc",
    description: "total bytes of allocated heap",
    measure: &HEAP_ALLOC,
    aggregation: Aggregation::LastValue,
};

/// View over [`HEAP_SYSTEM`].
pub static HEAP_SYSTEM_VIEW: View = View {
    name: "process/sys_heap",
    description: "Bytes of heap memory obtained from the OS",
    measure: &HEAP_SYSTEM,
    aggregation: Aggregation::LastValue,
};

/// View over [`PAUSE_NS`].
pub static PAUSE_NS_VIEW: View = View {
    name: "process/pause_ns",
    description: "most recent stop the world duration",
    measure: &PAUSE_NS,
    aggregation: Aggregation::LastValue,
};

/// All views in the order they are recorded on every tick.
pub static ALL_VIEWS: [&View; 4] = [
    &TASK_COUNT_VIEW,
    &HEAP_ALLOC_VIEW,
    &HEAP_SYSTEM_VIEW,
    &PAUSE_NS_VIEW,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_names() {
        let names: Vec<_> = ALL_VIEWS.iter().map(|v| v.name).collect();
        assert_eq!(
            names,
            [
                "process/cpu_goroutines",
                "process/heap_alloc",
                "process/sys_heap",
                "process/pause_ns",
            ]
        );
    }

    #[test]
    fn test_units() {
        assert_eq!(TASK_COUNT_VIEW.unit(), MetricUnit::Dimensionless);
        assert_eq!(HEAP_ALLOC_VIEW.unit(), MetricUnit::Bytes);
        assert_eq!(HEAP_SYSTEM_VIEW.unit(), MetricUnit::Bytes);
        assert_eq!(PAUSE_NS_VIEW.unit(), MetricUnit::Milliseconds);
    }

    #[test]
    fn test_all_last_value() {
        assert!(ALL_VIEWS
            .iter()
            .all(|v| v.aggregation == Aggregation::LastValue));
    }

    #[test]
    fn test_view_display() {
        assert_eq!(
            HEAP_ALLOC_VIEW.to_string(),
            "process/heap_alloc [bytes, last_value]"
        );
    }
}
