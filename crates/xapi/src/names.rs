//! XAPI element names and fixed content values.

pub const LIBTRANS: &str = "libtrans";
pub const LIBREPLY: &str = "libreply";
pub const HEADER: &str = "header";
pub const COMMAND: &str = "command";

pub const ELS_VERSION: &str = "els_version";
pub const HOST_NAME: &str = "host_name";
pub const CLIENT_TYPE: &str = "client_type";
pub const CLIENT_NAME: &str = "client_name";
pub const LIBRARY_NAME: &str = "library_name";
pub const TAPEPLEX_NAME: &str = "tapeplex_name";
pub const SUBSYSTEM_NAME: &str = "subsystem_name";
pub const SERVER_TYPE: &str = "server_type";
pub const TASK_TOKEN: &str = "task_token";
pub const TRACE_FLAG: &str = "trace_flag";
pub const CONFIGURATION_TOKEN: &str = "configuration_token";
pub const DATE: &str = "date";
pub const TIME: &str = "time";
pub const RACF_USER_ID: &str = "racf_user_id";
pub const RACF_GROUP_ID: &str = "racf_group_id";
pub const XML_RESPONSE_FLAG: &str = "xml_response_flag";
pub const XML_DATE_FORMAT: &str = "xml_date_format";
pub const XML_CASE: &str = "xml_case";
pub const JOB_INFO: &str = "job_info";
pub const USER_NAME: &str = "user_name";
pub const JOBNAME: &str = "jobname";
pub const STEPNAME: &str = "stepname";

pub const UUI_RETURN_CODE: &str = "uui_return_code";
pub const UUI_REASON_CODE: &str = "uui_reason_code";
pub const EXCEPTIONS: &str = "exceptions";
pub const REASON: &str = "reason";

pub const QUERY_CAP: &str = "query_cap";
pub const QUERY_ACS: &str = "query_acs";
pub const QUERY_LSM: &str = "query_lsm";
pub const CAP_LIST: &str = "cap_list";
pub const ACS_LIST: &str = "acs_list";
pub const LSM_LIST: &str = "lsm_list";
pub const CAP_LOCATION_DATA: &str = "cap_location_data";
pub const LSM_LOCATION_DATA: &str = "lsm_location_data";
pub const DETAIL_REQUEST: &str = "detail_request";
pub const CAP_DATA: &str = "cap_data";
pub const ACS_DATA: &str = "acs_data";
pub const LSM_DATA: &str = "lsm_data";

pub const ACS: &str = "acs";
pub const LSM: &str = "lsm";
pub const CAP: &str = "cap";
pub const ACS_STATUS: &str = "acs_status";
pub const LSM_COUNT: &str = "lsm_count";
pub const CELL_COUNT: &str = "cell_count";
pub const FREE_CELL_COUNT: &str = "free_cell_count";
pub const SCRATCH_COUNT: &str = "scratch_count";
pub const CLEANER_COUNT: &str = "cleaner_count";
pub const ADJACENT_COUNT: &str = "adjacent_count";
pub const PANEL_COUNT: &str = "panel_count";
pub const CAP_COUNT: &str = "cap_count";
pub const DUAL_LMU_CONFIG: &str = "dual_lmu_config";
pub const MODEL: &str = "model";
pub const MODE: &str = "mode";
pub const STATUS: &str = "status";
pub const STATE: &str = "state";
pub const PRIORITY: &str = "priority";
pub const PART_ID: &str = "part_id";
pub const ROW_COUNT: &str = "row_count";
pub const COLUMN_COUNT: &str = "column_count";
pub const MAGAZINE_COUNT: &str = "magazine_count";
pub const CELLS_PER_MAGAZINE: &str = "cells_per_magazine";
pub const CAP_TYPE: &str = "cap_type";
pub const CAP_JOBNAME_OWNER: &str = "cap_jobname_owner";
pub const RESULT: &str = "result";
pub const ERROR: &str = "error";

pub const QUERY_SERVER: &str = "query_server";
pub const SERVER_DATA: &str = "server_data";
pub const SERVICE_LEVEL: &str = "service_level";
pub const SUBSYSTEM_START_DATE: &str = "subsystem_start_date";
pub const SUBSYSTEM_START_TIME: &str = "subsystem_start_time";
pub const TERMINATION_IN_PROGRESS: &str = "termination_in_progress";
pub const VTCS_AVAILABLE: &str = "vtcs_available";

pub const QUERY_DRIVE_INFO: &str = "query_drive_info";
pub const DRIVE_LIST: &str = "drive_list";
pub const DRIVE_INFO: &str = "drive_info";
pub const DRIVE_NAME: &str = "drive_name";
pub const DRIVE_LOCATION_ID: &str = "drive_location_id";
pub const DRIVE_LIBRARY_ADDRESS: &str = "drive_library_address";
pub const DRIVE_NUMBER: &str = "drive_number";
pub const PANEL: &str = "panel";
pub const RECTECH: &str = "rectech";
pub const VTSS_NAME: &str = "vtss_name";
pub const SERIAL_NUMBER: &str = "serial_number";

pub const QUERY_VOLUME_INFO: &str = "query_volume_info";
pub const VOLUME_LIST: &str = "volume_list";
pub const VOLUME_DATA: &str = "volume_data";
pub const VOLSER: &str = "volser";
pub const MEDIA: &str = "media";
pub const MEDIA_TYPE: &str = "media_type";
pub const HOME_CELL: &str = "home_cell";
pub const DEVICE_ADDRESS: &str = "device_address";

pub const MOUNT: &str = "mount";
pub const MOUNT_DATA: &str = "mount_data";
pub const READ_ONLY: &str = "read_only";
pub const DISMOUNT: &str = "dismount";
pub const DISMOUNT_DATA: &str = "dismount_data";
pub const REWIND_UNLOAD: &str = "rewind_unload";

/// Fixed content values.
pub mod content {
    pub const YES: &str = "Y";
    pub const NO: &str = "N";
    pub const CLIENT_TYPE: &str = "CDK";
    pub const JOBNAME: &str = "CDK";
    pub const STEPNAME: &str = "SSI";
    pub const DEFAULT_USER: &str = "XAPIUSER";
    pub const CASE_UPPER: &str = "U";
    pub const CASE_MIXED: &str = "M";
    /// Media name of virtual volumes.
    pub const VIRTUAL: &str = "VIRTUAL";
    /// Volume serial reported when a reply omits it.
    pub const UNKNOWN_VOLSER: &str = "??????";
}
