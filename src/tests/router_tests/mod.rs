mod analytics_tests;
mod lead_routes_tests;
