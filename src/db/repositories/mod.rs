mod focus_checks;
mod tasks;
