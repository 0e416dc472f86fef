pub mod alert_cron;
