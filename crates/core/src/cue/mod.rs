pub mod cue;
pub mod cue_list;
pub mod scheduler;
pub mod timer;
