mod parallel;
mod pipeline;
mod scenarios;
