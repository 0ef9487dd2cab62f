use std::sync::Arc;

use tonic::{Request, Response, Status};

use paygate_common::error::ServiceError;
use paygate_common::requests::{CreateSaldoRequest, StatsGrain, UpdateSaldoRequest};
use paygate_services::{SaldoCommandService, SaldoQueryService, SaldoStatsService};

use super::convert;
use super::pb;
use super::pb::saldo_command_server::SaldoCommand;
use super::pb::saldo_query_server::SaldoQuery;
use super::pb::saldo_stats_server::SaldoStats;

pub struct SaldoQueryRpc {
    service: Arc<SaldoQueryService>,
}

impl SaldoQueryRpc {
    pub fn new(service: Arc<SaldoQueryService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl SaldoQuery for SaldoQueryRpc {
    async fn find_all(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::SaldoListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_all(filter).await?;
        Ok(Response::new(convert::saldo_list(page)))
    }

    async fn find_by_id(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::SaldoReply>, Status> {
        let saldo = self.service.find_by_id(request.into_inner().id).await?;
        Ok(Response::new(pb::SaldoReply {
            saldo: Some(convert::saldo(&saldo)),
        }))
    }

    async fn find_by_card_number(
        &self,
        request: Request<pb::CardNumberRequest>,
    ) -> Result<Response<pb::SaldoReply>, Status> {
        let saldo = self
            .service
            .find_by_card_number(request.into_inner().card_number)
            .await?;
        Ok(Response::new(pb::SaldoReply {
            saldo: Some(convert::saldo(&saldo)),
        }))
    }

    async fn find_by_active(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::SaldoListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_active(filter).await?;
        Ok(Response::new(convert::saldo_list(page)))
    }

    async fn find_by_trashed(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::SaldoListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_trashed(filter).await?;
        Ok(Response::new(convert::saldo_list(page)))
    }
}

pub struct SaldoCommandRpc {
    service: Arc<SaldoCommandService>,
}

impl SaldoCommandRpc {
    pub fn new(service: Arc<SaldoCommandService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl SaldoCommand for SaldoCommandRpc {
    async fn create(
        &self,
        request: Request<pb::CreateSaldoRequest>,
    ) -> Result<Response<pb::SaldoReply>, Status> {
        let req = request.into_inner();
        let saldo = self
            .service
            .create(CreateSaldoRequest {
                card_number: req.card_number,
                total_balance: req.total_balance,
            })
            .await?;
        Ok(Response::new(pb::SaldoReply {
            saldo: Some(convert::saldo(&saldo)),
        }))
    }

    async fn update(
        &self,
        request: Request<pb::UpdateSaldoRequest>,
    ) -> Result<Response<pb::SaldoReply>, Status> {
        let req = request.into_inner();
        let saldo = self
            .service
            .update(UpdateSaldoRequest {
                id: req.id,
                card_number: req.card_number,
                total_balance: req.total_balance,
            })
            .await?;
        Ok(Response::new(pb::SaldoReply {
            saldo: Some(convert::saldo(&saldo)),
        }))
    }

    async fn trashed(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::SaldoReply>, Status> {
        let saldo = self.service.trashed(request.into_inner().id).await?;
        Ok(Response::new(pb::SaldoReply {
            saldo: Some(convert::saldo(&saldo)),
        }))
    }

    async fn restore(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::SaldoReply>, Status> {
        let saldo = self.service.restore(request.into_inner().id).await?;
        Ok(Response::new(pb::SaldoReply {
            saldo: Some(convert::saldo(&saldo)),
        }))
    }

    async fn delete_permanent(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.service.delete_permanent(request.into_inner().id).await?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn restore_all(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.restore_all().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }

    async fn delete_all_permanent(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.delete_all_permanent().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }
}

pub struct SaldoStatsRpc {
    service: Arc<SaldoStatsService>,
}

impl SaldoStatsRpc {
    pub fn new(service: Arc<SaldoStatsService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl SaldoStats for SaldoStatsRpc {
    async fn get_balance_series(
        &self,
        request: Request<pb::SaldoStatsRequest>,
    ) -> Result<Response<pb::StatsReply>, Status> {
        let req = request.into_inner();
        let grain = StatsGrain::parse(&req.grain).map_err(Status::from)?;
        if req.year == 0 {
            return Err(ServiceError::invalid_field("year is required").into());
        }
        let series = self
            .service
            .balance_series(
                grain,
                req.year,
                (!req.card_number.is_empty()).then_some(req.card_number),
            )
            .await?;
        Ok(Response::new(convert::stats_reply(series)))
    }
}
