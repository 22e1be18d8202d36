pub mod types;
pub mod yaml;

pub use types::{Flow, Metric, Phase, RunnerKind, Step, StepAction, SwipeDirection};
pub use yaml::{collect_flow_files, load_flows, parse_flow_content, parse_flow_file};
