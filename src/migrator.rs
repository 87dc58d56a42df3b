use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_vehicles_table::Migration),
            Box::new(m20240101_000003_create_service_requests_table::Migration),
            Box::new(m20240101_000004_create_invoices_table::Migration),
            Box::new(m20240101_000005_create_service_items_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                        .col(ColumnDef::new(Users::Phone).string().not_null())
                        .col(ColumnDef::new(Users::Address).string().not_null())
                        .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_role")
                        .table(Users::Table)
                        .col(Users::Role)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Role,
        Phone,
        Address,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_vehicles_table {
    use super::m20240101_000001_create_users_table::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_vehicles_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Vehicles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Vehicles::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Vehicles::UserId).uuid().not_null())
                        .col(ColumnDef::new(Vehicles::Make).string().not_null())
                        .col(ColumnDef::new(Vehicles::Model).string().not_null())
                        .col(ColumnDef::new(Vehicles::Year).integer().not_null())
                        .col(
                            ColumnDef::new(Vehicles::LicensePlate)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Vehicles::VinNumber).string().null())
                        .col(ColumnDef::new(Vehicles::Mileage).integer().null())
                        .col(ColumnDef::new(Vehicles::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Vehicles::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_vehicles_user_id")
                                .from(Vehicles::Table, Vehicles::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_vehicles_user_id")
                        .table(Vehicles::Table)
                        .col(Vehicles::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Vehicles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Vehicles {
        Table,
        Id,
        UserId,
        Make,
        Model,
        Year,
        LicensePlate,
        VinNumber,
        Mileage,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_service_requests_table {
    use super::m20240101_000001_create_users_table::Users;
    use super::m20240101_000002_create_vehicles_table::Vehicles;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_service_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ServiceRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ServiceRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceRequests::VehicleId).uuid().not_null())
                        .col(ColumnDef::new(ServiceRequests::MechanicId).uuid().null())
                        .col(
                            ColumnDef::new(ServiceRequests::Description)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceRequests::ServiceType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceRequests::Priority)
                                .string_len(10)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceRequests::PreferredDate)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ServiceRequests::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceRequests::MechanicNotes).string().null())
                        .col(
                            ColumnDef::new(ServiceRequests::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceRequests::AssignedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_service_requests_vehicle_id")
                                .from(ServiceRequests::Table, ServiceRequests::VehicleId)
                                .to(Vehicles::Table, Vehicles::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_service_requests_mechanic_id")
                                .from(ServiceRequests::Table, ServiceRequests::MechanicId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_service_requests_vehicle_id")
                        .table(ServiceRequests::Table)
                        .col(ServiceRequests::VehicleId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_service_requests_status")
                        .table(ServiceRequests::Table)
                        .col(ServiceRequests::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ServiceRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ServiceRequests {
        Table,
        Id,
        VehicleId,
        MechanicId,
        Description,
        ServiceType,
        Priority,
        PreferredDate,
        Status,
        MechanicNotes,
        CreatedAt,
        AssignedAt,
    }
}

mod m20240101_000004_create_invoices_table {
    use super::m20240101_000003_create_service_requests_table::ServiceRequests;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_invoices_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Invoices::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Invoices::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Invoices::ServiceRequestId).uuid().not_null())
                        .col(
                            ColumnDef::new(Invoices::TotalAmount)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Invoices::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Invoices::BillingAddress).string().null())
                        .col(ColumnDef::new(Invoices::BillingCity).string().null())
                        .col(ColumnDef::new(Invoices::BillingZip).string().null())
                        .col(ColumnDef::new(Invoices::PaymentMethod).string().null())
                        .col(ColumnDef::new(Invoices::CardLastFour).string_len(4).null())
                        .col(ColumnDef::new(Invoices::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Invoices::PaidAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoices_service_request_id")
                                .from(Invoices::Table, Invoices::ServiceRequestId)
                                .to(ServiceRequests::Table, ServiceRequests::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_invoices_service_request_id")
                        .table(Invoices::Table)
                        .col(Invoices::ServiceRequestId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Invoices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Invoices {
        Table,
        Id,
        ServiceRequestId,
        TotalAmount,
        Status,
        BillingAddress,
        BillingCity,
        BillingZip,
        PaymentMethod,
        CardLastFour,
        CreatedAt,
        PaidAt,
    }
}

mod m20240101_000005_create_service_items_table {
    use super::m20240101_000004_create_invoices_table::Invoices;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_service_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ServiceItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ServiceItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        // Nullable on purpose: items may be created detached and
                        // linked to an invoice later; the startup sweep removes
                        // any that stay detached.
                        .col(ColumnDef::new(ServiceItems::InvoiceId).uuid().null())
                        .col(ColumnDef::new(ServiceItems::Name).string().not_null())
                        .col(ColumnDef::new(ServiceItems::Description).string().null())
                        .col(ColumnDef::new(ServiceItems::Price).decimal_len(10, 2).not_null())
                        .col(ColumnDef::new(ServiceItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(ServiceItems::ItemType)
                                .string_len(10)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceItems::PartNumber).string().null())
                        .col(ColumnDef::new(ServiceItems::WarrantyInfo).string().null())
                        .col(ColumnDef::new(ServiceItems::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_service_items_invoice_id")
                                .from(ServiceItems::Table, ServiceItems::InvoiceId)
                                .to(Invoices::Table, Invoices::Id)
                                // Deleting an invoice detaches its items; the
                                // startup sweep purges whatever stays detached.
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_service_items_invoice_id")
                        .table(ServiceItems::Table)
                        .col(ServiceItems::InvoiceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ServiceItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ServiceItems {
        Table,
        Id,
        InvoiceId,
        Name,
        Description,
        Price,
        Quantity,
        ItemType,
        PartNumber,
        WarrantyInfo,
        CreatedAt,
    }
}
