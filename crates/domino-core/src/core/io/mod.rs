pub mod problem_file;
