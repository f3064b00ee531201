mod keyword_search;
mod parametrize;
mod removal;
mod service;
mod test_utils;
